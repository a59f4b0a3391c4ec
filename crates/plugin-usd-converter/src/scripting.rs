//! Host-side conversion steps and Blender Python script generation.
//!
//! The steps executed inside Blender are expressed through [`HostSession`].
//! [`ScriptSession`] records them as a Python program that a headless
//! Blender runs with `-P`.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::ConversionError;
use crate::models::{ExportOptions, OutputFormat};

/// Operations available inside the host application.
pub trait HostSession {
    /// Start from an empty scene with factory settings.
    fn reset(&mut self) -> Result<(), ConversionError>;

    /// Import a USD stage into the current scene.
    fn import_stage(&mut self, stage: &Path) -> Result<(), ConversionError>;

    /// Export the current scene as glTF.
    fn export(
        &mut self,
        output: &Path,
        format: OutputFormat,
        options: &ExportOptions,
    ) -> Result<(), ConversionError>;
}

/// Run the conversion steps against a host session.
///
/// This is the "inside the host" half of a conversion: the stage path is
/// already resolved and the output path already normalized.
pub fn execute_in_host<S: HostSession + ?Sized>(
    session: &mut S,
    stage: &Path,
    output: &Path,
    format: OutputFormat,
    options: &ExportOptions,
) -> Result<(), ConversionError> {
    session.reset()?;
    session.import_stage(stage)?;
    session.export(output, format, options)
}

const SCRIPT_PRELUDE: &str = r#"import os
import shutil
import sys
import tempfile
import zipfile

import bpy


def _check(result, step):
    if "FINISHED" not in result:
        print(f"usd-gltf: {step} did not finish: {result}", file=sys.stderr)
        sys.exit(1)

"#;

/// Records host operations as Blender Python statements.
#[derive(Debug, Default)]
pub struct ScriptSession {
    lines: Vec<String>,
    /// Archive the script extracts into its own temporary directory.
    archive: Option<PathBuf>,
}

impl ScriptSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the script extract `archive` into a fresh temporary directory
    /// and remove that directory when it ends, successful or not.
    ///
    /// Stage paths passed to [`HostSession::import_stage`] are then taken
    /// relative to the extraction root.
    pub fn with_archive(mut self, archive: impl Into<PathBuf>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    /// Finish recording.
    pub fn into_script(self) -> HostScript {
        let mut content = String::from(SCRIPT_PRELUDE);
        match self.archive {
            None => {
                for line in self.lines {
                    content.push_str(&line);
                    content.push('\n');
                }
            }
            Some(archive) => {
                content.push_str("_work = tempfile.mkdtemp(prefix=\"usd-gltf-\")\n");
                content.push_str("try:\n");
                content.push_str(&format!(
                    "    with zipfile.ZipFile({}) as _archive:\n        _archive.extractall(_work)\n",
                    py_str(&archive)
                ));
                for line in self.lines {
                    content.push_str("    ");
                    content.push_str(&line);
                    content.push('\n');
                }
                content.push_str("finally:\n");
                content.push_str("    shutil.rmtree(_work, ignore_errors=True)\n");
            }
        }
        HostScript { content }
    }
}

impl HostSession for ScriptSession {
    fn reset(&mut self) -> Result<(), ConversionError> {
        self.lines.push(
            r#"_check(bpy.ops.wm.read_factory_settings(use_empty=True), "read_factory_settings")"#
                .to_string(),
        );
        Ok(())
    }

    fn import_stage(&mut self, stage: &Path) -> Result<(), ConversionError> {
        let filepath = if self.archive.is_some() {
            format!("os.path.join(_work, {})", py_str(stage))
        } else {
            py_str(stage)
        };
        self.lines.push(format!(
            r#"_check(bpy.ops.wm.usd_import(filepath={filepath}), "usd_import")"#
        ));
        Ok(())
    }

    fn export(
        &mut self,
        output: &Path,
        format: OutputFormat,
        options: &ExportOptions,
    ) -> Result<(), ConversionError> {
        let output = py_str(output);
        self.lines
            .push(format!("os.makedirs(os.path.dirname({output}), exist_ok=True)"));
        self.lines.push(format!(
            "_check(bpy.ops.export_scene.gltf(filepath={}, export_format={}, export_yup={}, \
             export_apply={}, export_cameras={}, export_lights={}, use_selection={}), \
             \"export_scene.gltf\")",
            output,
            py_quote(format.exporter_name()),
            py_bool(options.y_up),
            py_bool(options.apply_transforms),
            py_bool(options.include_cameras),
            py_bool(options.include_lights),
            py_bool(options.selected_only),
        ));
        self.lines.push(format!("print({output})"));
        Ok(())
    }
}

/// A generated Blender Python program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostScript {
    content: String,
}

impl HostScript {
    /// Script source.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Write the script into `dir` under a unique name.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, ConversionError> {
        let script_path = dir.join(format!("convert__{}.py", Uuid::now_v7().simple()));

        let mut file = tokio::fs::File::create(&script_path).await?;
        file.write_all(self.content.as_bytes()).await?;
        file.flush().await?;

        Ok(script_path)
    }
}

/// Python string literal for a path. JSON string syntax is a subset of
/// Python's, so escaping is delegated to serde_json.
fn py_str(path: &Path) -> String {
    py_quote(&path.to_string_lossy())
}

fn py_quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn py_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}
