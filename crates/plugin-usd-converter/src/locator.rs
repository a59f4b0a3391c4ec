//! Stage discovery: picks the single USD stage file to import from a
//! directory, a zip-format archive, or a direct file reference.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConversionError;
use crate::filesystem::FsUtils;
use crate::models::{StageCandidate, StageFormat, is_archive_path};

/// Resolves input references to one concrete stage path.
pub struct StageLocator;

impl StageLocator {
    /// Find the main stage file under `root`.
    ///
    /// Immediate children are considered first; subdirectories are only
    /// scanned when `root` itself holds no stage file. Candidates are ranked
    /// by extension (`usda` < `usd` < `usdc` = `usdb`) and then by depth.
    pub fn locate_in_directory(root: &Path) -> Result<PathBuf, ConversionError> {
        let mut candidates = Self::candidates(root, FsUtils::files_in_directory(root)?);

        if candidates.is_empty() {
            debug!(root = %root.display(), "No stage at top level, scanning subdirectories");
            candidates = Self::candidates(root, FsUtils::files_below_directory(root)?);
        }

        let chosen = Self::select(candidates).ok_or_else(|| ConversionError::NoStageFound {
            root: root.to_path_buf(),
        })?;

        info!(
            root = %root.display(),
            stage = %chosen.path.display(),
            format = ?chosen.format,
            depth = chosen.depth,
            "Selected USD stage"
        );
        Ok(chosen.path)
    }

    /// Extract `archive_path` into `extract_dir` and locate the stage inside.
    pub fn locate_in_archive(
        archive_path: &Path,
        extract_dir: &Path,
    ) -> Result<PathBuf, ConversionError> {
        FsUtils::extract_zip_file(archive_path, extract_dir)?;
        Self::locate_in_directory(extract_dir)
    }

    /// Resolve any input reference.
    ///
    /// Directories are scanned, `.usdz`/`.zip` archives are extracted into
    /// `scratch_dir`, and any other file is returned unchanged so the host
    /// importer can report on it.
    pub fn resolve(input: &Path, scratch_dir: &Path) -> Result<PathBuf, ConversionError> {
        if input.is_dir() {
            Self::locate_in_directory(input)
        } else if is_archive_path(input) {
            Self::locate_in_archive(input, scratch_dir)
        } else {
            Ok(input.to_path_buf())
        }
    }

    /// Turn scanned files into stage candidates, in scan order.
    fn candidates(root: &Path, files: Vec<PathBuf>) -> Vec<StageCandidate> {
        files
            .into_iter()
            .filter(|p| StageFormat::from_path(p).is_stage())
            .map(|p| StageCandidate::new(root, p))
            .collect()
    }

    /// Pick the best candidate. The sort is stable, so equal scores keep
    /// scan order; `usdc` is listed ahead of `usdb` at equal depth.
    fn select(mut candidates: Vec<StageCandidate>) -> Option<StageCandidate> {
        candidates.sort_by_key(|c| {
            let (rank, depth) = c.score();
            (rank, depth, Self::pattern_order(c.format))
        });
        candidates.into_iter().next()
    }

    fn pattern_order(format: StageFormat) -> usize {
        let ext = match format {
            StageFormat::Usda => "usda",
            StageFormat::Usd => "usd",
            StageFormat::Usdc => "usdc",
            StageFormat::Usdb => "usdb",
            StageFormat::Other => return StageFormat::SCANNED_EXTENSIONS.len(),
        };
        StageFormat::SCANNED_EXTENSIONS
            .iter()
            .position(|e| *e == ext)
            .unwrap_or(StageFormat::SCANNED_EXTENSIONS.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, b"#usda 1.0\n").expect("write");
        path
    }

    #[test]
    fn test_text_stage_beats_compiled_at_same_depth() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "model.usdc");
        let text = touch(temp.path(), "model.usda");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, text);
    }

    #[test]
    fn test_generic_usd_beats_compiled() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "a.usdb");
        touch(temp.path(), "b.usdc");
        let generic = touch(temp.path(), "c.usd");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, generic);
    }

    #[test]
    fn test_recursive_fallback_finds_deep_compiled_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "readme.txt");
        let deep = touch(temp.path(), "assets/geo/chair.usdc");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, deep);
    }

    #[test]
    fn test_top_level_match_skips_recursion() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "nested/better.usda");
        let top = touch(temp.path(), "top.usdc");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, top);
    }

    #[test]
    fn test_shallower_wins_at_equal_rank() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "a/b/c/deep.usd");
        let shallow = touch(temp.path(), "z/shallow.usd");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, shallow);
    }

    #[test]
    fn test_rank_dominates_depth() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "a/shallow.usdc");
        let deep_text = touch(temp.path(), "b/c/d/deep.usda");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, deep_text);
    }

    #[test]
    fn test_uppercase_extension_is_recognized() {
        let temp = tempfile::tempdir().expect("tempdir");
        let stage = touch(temp.path(), "SCENE.USDA");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, stage);
    }

    #[test]
    fn test_resource_fork_files_are_ignored() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "._chair.usda");
        let stage = touch(temp.path(), "chair.usdc");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, stage);
    }

    #[test]
    fn test_hidden_directories_are_not_searched() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), ".hidden/x.usda");
        let stage = touch(temp.path(), "sub/y.usdc");

        let found = StageLocator::locate_in_directory(temp.path()).expect("found");
        assert_eq!(found, stage);
    }

    #[test]
    fn test_only_hidden_stages_means_no_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), ".hidden/x.usda");
        touch(temp.path(), ".scene.usd");

        let result = StageLocator::locate_in_directory(temp.path());
        assert!(matches!(result, Err(ConversionError::NoStageFound { .. })));
    }

    #[test]
    fn test_empty_directory_has_no_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "textures/wood.png");

        let result = StageLocator::locate_in_directory(temp.path());
        assert!(matches!(result, Err(ConversionError::NoStageFound { .. })));
    }

    #[test]
    fn test_archive_returns_usda_and_ignores_textures() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("scene.usdz");
        {
            let file = fs::File::create(&archive).expect("create");
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("scene/root.usda", options).expect("start");
            zip.write_all(b"#usda 1.0\n").expect("write");
            zip.start_file("scene/textures/tex.png", options).expect("start");
            zip.write_all(b"\x89PNG").expect("write");
            zip.finish().expect("finish");
        }

        let extract_dir = temp.path().join("extract");
        fs::create_dir_all(&extract_dir).expect("mkdir");

        let found = StageLocator::locate_in_archive(&archive, &extract_dir).expect("found");
        assert_eq!(found, extract_dir.join("scene/root.usda"));
    }

    #[test]
    fn test_archive_without_stage_propagates_no_stage() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("empty.usdz");
        {
            let file = fs::File::create(&archive).expect("create");
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("notes.txt", zip::write::SimpleFileOptions::default())
                .expect("start");
            zip.write_all(b"nothing here").expect("write");
            zip.finish().expect("finish");
        }

        let result = StageLocator::locate_in_archive(&archive, &temp.path().join("x"));
        assert!(matches!(result, Err(ConversionError::NoStageFound { .. })));
    }

    #[test]
    fn test_resolve_passes_direct_files_through() {
        let temp = tempfile::tempdir().expect("tempdir");
        let stage = touch(temp.path(), "direct.usdc");

        let found = StageLocator::resolve(&stage, &temp.path().join("scratch")).expect("ok");
        assert_eq!(found, stage);
        assert!(!temp.path().join("scratch").exists());
    }
}
