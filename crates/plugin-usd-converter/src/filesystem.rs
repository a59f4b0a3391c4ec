//! Filesystem utilities for the conversion pipeline.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ConversionError;

/// Filesystem utility functions.
pub struct FsUtils;

impl FsUtils {
    /// Maximum entries in an archive.
    const MAX_ZIP_FILES: usize = 10_000;
    /// Maximum total extracted size (10 GB).
    const MAX_EXTRACTED_SIZE: u64 = 10 * 1024 * 1024 * 1024;
    /// Buffer size for archive copy.
    const BUFFER_SIZE: usize = 64 * 1024;

    /// Extract filename as String; returns `"unknown_file"` for empty paths.
    pub fn extract_filename_str(path: &Path) -> String {
        path.file_name()
            .and_then(|f| f.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown_file".to_string())
    }

    /// Sanitize a filename stem for safe filesystem usage.
    pub fn sanitize_stem(filename: &str) -> String {
        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        let sanitized: String = stem
            .chars()
            .filter_map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    Some(c)
                } else if c.is_whitespace() {
                    Some('_')
                } else {
                    None
                }
            })
            .take(200)
            .collect();

        if sanitized.is_empty() {
            "unnamed_file".to_string()
        } else {
            sanitized
        }
    }

    /// Make `path` absolute against the current directory without touching
    /// the filesystem.
    pub fn absolutize(path: &Path) -> Result<PathBuf, ConversionError> {
        Ok(std::path::absolute(path)?)
    }

    /// Extract every entry of a zip-format archive directly into `extract_to`.
    ///
    /// Entry names that would escape `extract_to` are skipped. Entry count
    /// and total size are capped.
    pub fn extract_zip_file(zip_path: &Path, extract_to: &Path) -> Result<(), ConversionError> {
        let archive_err = |source: ZipError| ConversionError::ArchiveRead {
            path: zip_path.to_path_buf(),
            source,
        };

        let file = File::open(zip_path).map_err(|e| archive_err(ZipError::Io(e)))?;
        let mut archive = ZipArchive::new(file).map_err(archive_err)?;

        if archive.len() > Self::MAX_ZIP_FILES {
            return Err(ConversionError::ArchiveTooManyFiles {
                count: archive.len(),
                limit: Self::MAX_ZIP_FILES,
            });
        }

        fs::create_dir_all(extract_to)?;

        let mut total_size = 0u64;
        let mut buffer = vec![0u8; Self::BUFFER_SIZE];

        for i in 0..archive.len() {
            let mut zip_file = archive.by_index(i).map_err(archive_err)?;

            let enclosed_name = match zip_file.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    warn!(entry = %zip_file.name(), "Skipping archive entry outside extraction root");
                    continue;
                }
            };

            let out_path = extract_to.join(&enclosed_name);

            total_size += zip_file.size();
            if total_size > Self::MAX_EXTRACTED_SIZE {
                return Err(ConversionError::ArchiveTooLarge {
                    limit: Self::MAX_EXTRACTED_SIZE,
                });
            }

            if zip_file.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(p) = out_path.parent() {
                fs::create_dir_all(p)?;
            }
            let mut outfile = File::create(&out_path)?;
            loop {
                let n = zip_file
                    .read(&mut buffer)
                    .map_err(|e| archive_err(ZipError::Io(e)))?;
                if n == 0 {
                    break;
                }
                outfile.write_all(&buffer[..n])?;
            }
        }

        debug!(
            archive = %zip_path.display(),
            entries = archive.len(),
            bytes = total_size,
            "Archive extracted"
        );

        Ok(())
    }

    /// List the regular files directly inside `dir`, sorted by name.
    pub fn files_in_directory(dir: &Path) -> Result<Vec<PathBuf>, ConversionError> {
        let (files, _) = Self::read_sorted(dir)?;
        Ok(files)
    }

    /// List every regular file at any depth below `dir`, in sorted
    /// depth-first order. Symlinked directories are not followed.
    pub fn files_below_directory(dir: &Path) -> Result<Vec<PathBuf>, ConversionError> {
        let mut files = Vec::new();
        let mut dirs_to_visit = vec![dir.to_path_buf()];

        while let Some(current_dir) = dirs_to_visit.pop() {
            let (mut here, subdirs) = match Self::read_sorted(&current_dir) {
                Ok(listing) => listing,
                Err(e) if current_dir != dir => {
                    warn!(
                        dir = %current_dir.display(),
                        error = %e,
                        "Failed to read directory, skipping"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            files.append(&mut here);
            // Reverse so the stack pops subdirectories in name order.
            dirs_to_visit.extend(subdirs.into_iter().rev());
        }

        Ok(files)
    }

    /// Read one directory level, returning (files, subdirectories), each
    /// sorted by path. Hidden entries (leading `.`) are skipped, including
    /// macOS `._*` resource forks.
    fn read_sorted(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), ConversionError> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                dirs.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        dirs.sort();
        Ok((files, dirs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).expect("start file");
            writer.write_all(data).expect("write entry");
        }
        writer.finish().expect("finish zip");
    }

    #[test]
    fn test_sanitize_stem_edge_cases() {
        assert_eq!(FsUtils::sanitize_stem("a b c.usdz"), "a_b_c");
        assert_eq!(FsUtils::sanitize_stem("chair<>:\"|?*.usd"), "chair");
        assert_eq!(FsUtils::sanitize_stem(""), "unnamed_file");

        let long_name = "a".repeat(300) + ".usda";
        assert_eq!(FsUtils::sanitize_stem(&long_name).len(), 200);
    }

    #[test]
    fn test_extract_zip_preserves_layout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("asset.usdz");
        write_zip(
            &archive,
            &[("scene/root.usda", b"#usda 1.0\n"), ("scene/tex/a.png", b"png")],
        );

        let out = temp.path().join("out");
        FsUtils::extract_zip_file(&archive, &out).expect("extract");

        assert!(out.join("scene/root.usda").is_file());
        assert!(out.join("scene/tex/a.png").is_file());
    }

    #[test]
    fn test_extract_corrupt_archive_is_archive_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("broken.usdz");
        std::fs::write(&archive, b"definitely not a zip").expect("write");

        let result = FsUtils::extract_zip_file(&archive, &temp.path().join("out"));
        assert!(matches!(result, Err(ConversionError::ArchiveRead { .. })));
    }

    #[test]
    fn test_extract_missing_archive_is_archive_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let result =
            FsUtils::extract_zip_file(Path::new("/nonexistent/a.usdz"), &temp.path().join("out"));
        assert!(matches!(result, Err(ConversionError::ArchiveRead { .. })));
    }

    #[test]
    fn test_listing_is_sorted_and_recursive() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        std::fs::create_dir_all(root.join("b/inner")).expect("mkdir");
        std::fs::create_dir_all(root.join("a")).expect("mkdir");
        std::fs::write(root.join("z.txt"), "").expect("write");
        std::fs::write(root.join("a/one.usd"), "").expect("write");
        std::fs::write(root.join("b/inner/two.usdc"), "").expect("write");

        let shallow = FsUtils::files_in_directory(root).expect("list");
        assert_eq!(shallow, vec![root.join("z.txt")]);

        let deep = FsUtils::files_below_directory(root).expect("walk");
        assert_eq!(
            deep,
            vec![
                root.join("z.txt"),
                root.join("a/one.usd"),
                root.join("b/inner/two.usdc"),
            ]
        );
    }
}
