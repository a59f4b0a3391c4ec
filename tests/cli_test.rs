//! End-to-end tests for the `usd-to-gltf` binary, using a shell script in
//! place of Blender.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Stand-in for Blender: finds the export path in the `-P` script and
/// writes a few bytes there.
const FAKE_BLENDER: &str = r#"#!/bin/sh
while [ "$#" -gt 0 ]; do
  if [ "$1" = "-P" ]; then script="$2"; fi
  shift
done
out=$(sed -n 's/.*export_scene.gltf(filepath="\([^"]*\)".*/\1/p' "$script")
cp "$script" "$(dirname "$out")/last-script.py"
printf 'glTF-bytes' > "$out"
"#;

const FAILING_BLENDER: &str = r#"#!/bin/sh
echo "Blender 4.2.0"
echo "RuntimeError: USD import failed" >&2
exit 2
"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn jobs(&self) -> PathBuf {
        self.path().join("jobs")
    }

    fn blender(&self, body: &str) -> PathBuf {
        let exe = self.path().join("blender");
        std::fs::write(&exe, body).expect("write");
        let mut perms = std::fs::metadata(&exe).expect("meta").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&exe, perms).expect("chmod");
        exe
    }

    fn run(&self, blender: &Path, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_usd-to-gltf"))
            .args(args)
            .current_dir(self.path())
            .env("BLENDER_PATH", blender)
            .env("USDCONV_CONVERTER__TEMP_ROOT", self.jobs())
            .env_remove("RUST_LOG")
            .output()
            .expect("run binary")
    }

    fn leftover_jobs(&self) -> usize {
        std::fs::read_dir(self.jobs())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn write_usdz(path: &Path, entries: &[&str]) {
    let file = std::fs::File::create(path).expect("create");
    let mut zip = zip::ZipWriter::new(file);
    for entry in entries {
        zip.start_file(*entry, zip::write::SimpleFileOptions::default())
            .expect("start");
        zip.write_all(b"#usda 1.0\n").expect("write");
    }
    zip.finish().expect("finish");
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn converts_single_stage_file_and_prints_only_the_path() {
    let fx = Fixture::new();
    let blender = fx.blender(FAKE_BLENDER);
    let input = fx.path().join("chair.usdc");
    std::fs::write(&input, b"PXR-USDC").expect("write");

    let out_base = fx.path().join("out/chair");
    let output = fx.run(
        &blender,
        &["--input", input.to_str().unwrap(), "--output", out_base.to_str().unwrap()],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let expected = fx.path().join("out/chair.glb");
    assert_eq!(stdout(&output), format!("{}\n", expected.display()));
    assert_eq!(std::fs::read(&expected).expect("read"), b"glTF-bytes");
    assert_eq!(fx.leftover_jobs(), 0);
}

#[test]
fn converts_archive_and_removes_extraction() {
    let fx = Fixture::new();
    let blender = fx.blender(FAKE_BLENDER);
    let archive = fx.path().join("scene.usdz");
    write_usdz(&archive, &["scene/geo/part.usdc", "scene/root.usda"]);

    let output = fx.run(
        &blender,
        &[
            "--input",
            archive.to_str().unwrap(),
            "--output",
            fx.path().join("scene.GLTF").to_str().unwrap(),
            "--format",
            "gltf",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let expected = fx.path().join("scene.GLTF");
    assert_eq!(stdout(&output).trim_end(), expected.display().to_string());
    assert!(expected.exists());

    let script = std::fs::read_to_string(fx.path().join("last-script.py")).expect("script");
    assert!(script.contains("/scene/root.usda\""));
    assert!(script.contains(r#"export_format="GLTF_EMBEDDED""#));
    assert_eq!(fx.leftover_jobs(), 0);
}

#[test]
fn converts_directory_input() {
    let fx = Fixture::new();
    let blender = fx.blender(FAKE_BLENDER);
    let asset = fx.path().join("asset");
    std::fs::create_dir_all(asset.join("sub")).expect("mkdir");
    std::fs::write(asset.join("sub/deep.usda"), "#usda 1.0\n").expect("write");
    std::fs::write(asset.join("top.usdc"), "PXR-USDC").expect("write");

    let output = fx.run(
        &blender,
        &[
            "--input",
            asset.to_str().unwrap(),
            "--output",
            fx.path().join("asset-out").to_str().unwrap(),
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let script = std::fs::read_to_string(fx.path().join("last-script.py")).expect("script");
    assert!(script.contains("/asset/top.usdc\""));
    assert!(fx.path().join("asset-out.glb").exists());
}

#[test]
fn missing_input_exits_nonzero_without_spawning() {
    let fx = Fixture::new();
    let blender = fx.blender(FAKE_BLENDER);

    let output = fx.run(
        &blender,
        &["--input", "missing.usdz", "--output", "out"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("missing.usdz"));
    assert!(!fx.path().join("last-script.py").exists());
    assert_eq!(fx.leftover_jobs(), 0);
}

#[test]
fn host_failure_reports_captured_output() {
    let fx = Fixture::new();
    let blender = fx.blender(FAILING_BLENDER);
    let archive = fx.path().join("broken.usdz");
    write_usdz(&archive, &["root.usda"]);

    let output = fx.run(
        &blender,
        &["--input", archive.to_str().unwrap(), "--output", "broken"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains("code 2"), "stderr: {err}");
    assert!(err.contains("Blender 4.2.0"));
    assert!(err.contains("USD import failed"));
    assert_eq!(fx.leftover_jobs(), 0);
}

#[test]
fn invalid_format_is_rejected() {
    let fx = Fixture::new();
    let blender = fx.blender(FAKE_BLENDER);
    let input = fx.path().join("a.usda");
    std::fs::write(&input, "#usda 1.0\n").expect("write");

    let output = fx.run(
        &blender,
        &["--input", input.to_str().unwrap(), "--output", "a", "--format", "OBJ"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("OBJ"));
    assert!(!fx.path().join("last-script.py").exists());
}

#[test]
fn blender_mode_prints_script_instead_of_spawning() {
    let fx = Fixture::new();
    let input = fx.path().join("lamp.usda");
    std::fs::write(&input, "#usda 1.0\n").expect("write");

    let output = fx.run(
        Path::new("/nonexistent/blender"),
        &[
            "--input",
            input.to_str().unwrap(),
            "--output",
            "lamp",
            "--blender-mode",
            "1",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let script = stdout(&output);
    assert!(script.starts_with("import os"));
    assert!(script.contains("bpy.ops.wm.usd_import"));
    assert!(script.contains("lamp.glb"));
    assert!(!script.contains("zipfile.ZipFile("));
    assert!(!fx.path().join("lamp.glb").exists());
}

#[test]
fn blender_mode_with_archive_leaves_no_scratch() {
    let fx = Fixture::new();
    let archive = fx.path().join("chair.usdz");
    write_usdz(&archive, &["notes/readme.usda", "chair.usdc"]);

    let output = fx.run(
        Path::new("/nonexistent/blender"),
        &[
            "--input",
            archive.to_str().unwrap(),
            "--output",
            "out/chair",
            "--blender-mode",
            "1",
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let script = stdout(&output);
    assert!(script.contains("tempfile.mkdtemp("));
    assert!(script.contains(r#"os.path.join(_work, "chair.usdc")"#));
    assert!(script.contains("shutil.rmtree(_work, ignore_errors=True)"));
    assert_eq!(fx.leftover_jobs(), 0);
    assert!(!fx.path().join("out").exists());
}
