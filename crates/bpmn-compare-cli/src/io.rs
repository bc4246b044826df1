/// Filesystem access with size enforcement and UTF-8 validation.
///
/// This module is the single place where the `bpmn-compare` binary touches
/// the filesystem. `bpmn-compare-core` never does; all reading and writing
/// happens here.
///
/// - Files: size checked via `std::fs::metadata` before any read.
/// - UTF-8 validation via `std::str::from_utf8` with byte-offset reporting.
/// - Folder listings via `walkdir`, one level deep, sorted by file name.
/// - All I/O errors are converted to [`CliError`] variants with exit code 2.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bpmn_compare_core::is_bpmn_file;
use walkdir::WalkDir;

use crate::error::CliError;

// ---------------------------------------------------------------------------
// File reading
// ---------------------------------------------------------------------------

/// Reads the entire contents of `path` into a `String`.
///
/// The file length is checked against `max_size` before any bytes are read.
///
/// # Errors
///
/// Returns [`CliError`] (exit code 2) for a missing file, a permission
/// problem, a file over `max_size`, any other I/O error, or invalid UTF-8.
pub fn read_file(path: &Path, max_size: u64) -> Result<String, CliError> {
    let file_size = std::fs::metadata(path)
        .map_err(|e| io_error_to_cli(&e, path))?
        .len();

    if file_size > max_size {
        return Err(CliError::FileTooLarge {
            source: path.display().to_string(),
            limit: max_size,
            actual: file_size,
        });
    }

    let bytes = std::fs::read(path).map_err(|e| io_error_to_cli(&e, path))?;
    bytes_to_string(&bytes, &path.display().to_string())
}

/// Maps a `std::io::Error` arising from a filesystem operation to a [`CliError`].
fn io_error_to_cli(e: &std::io::Error, path: &Path) -> CliError {
    let kind = e.kind();
    if kind == ErrorKind::NotFound {
        CliError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else if kind == ErrorKind::PermissionDenied {
        CliError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        CliError::IoError {
            source: path.display().to_string(),
            detail: e.to_string(),
        }
    }
}

/// Converts a byte buffer to a `String`, returning a [`CliError`] with the
/// byte offset of the first invalid sequence on failure.
fn bytes_to_string(bytes: &[u8], source_label: &str) -> Result<String, CliError> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_owned()),
        Err(e) => Err(CliError::InvalidUtf8 {
            source: source_label.to_owned(),
            byte_offset: e.valid_up_to(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

/// Fails unless `path` exists and is a directory.
///
/// # Errors
///
/// [`CliError::FileNotFound`], [`CliError::PermissionDenied`] or
/// [`CliError::NotADirectory`].
pub fn require_dir(path: &Path) -> Result<(), CliError> {
    let meta = std::fs::metadata(path).map_err(|e| io_error_to_cli(&e, path))?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(CliError::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}

/// Lists the `.bpmn` files directly inside `dir`, sorted by file name.
///
/// Sub-folders and files with other extensions are skipped.
///
/// # Errors
///
/// Returns [`CliError`] when `dir` is not a readable directory.
pub fn list_bpmn_files(dir: &Path) -> Result<Vec<String>, CliError> {
    require_dir(dir)?;
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error_to_cli(&e, dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping file with a non UTF-8 name");
            continue;
        };
        if is_bpmn_file(name) {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}

fn walk_error_to_cli(e: &walkdir::Error, dir: &Path) -> CliError {
    let path: PathBuf = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
    match e.io_error() {
        Some(io) => io_error_to_cli(io, &path),
        None => CliError::IoError {
            source: path.display().to_string(),
            detail: e.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Report output
// ---------------------------------------------------------------------------

/// Writes `content` to `path`, or to stdout when `path` is `None`.
///
/// # Errors
///
/// Returns [`CliError::IoError`] if the write fails.
pub fn write_report(path: Option<&Path>, content: &str) -> Result<(), CliError> {
    use std::io::Write as _;

    match path {
        Some(path) => std::fs::write(path, content).map_err(|e| CliError::IoError {
            source: path.display().to_string(),
            detail: e.to_string(),
        }),
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(content.as_bytes())
                .and_then(|()| out.flush())
                .map_err(|e| CliError::IoError {
                    source: "stdout".to_owned(),
                    detail: e.to_string(),
                })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::wildcard_enum_match_arm)]

    use std::io::Write as _;

    use super::*;

    // ── helpers ──────────────────────────────────────────────────────────────

    /// Creates a named temporary file with the given contents.
    fn temp_file_with(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("create temp file");
        f.write_all(contents).expect("write temp file");
        f
    }

    // ── read_file ────────────────────────────────────────────────────────────

    #[test]
    fn read_valid_utf8_file() {
        let content = "<definitions/>";
        let f = temp_file_with(content.as_bytes());
        let result = read_file(f.path(), 1024).expect("should read file");
        assert_eq!(result, content);
    }

    #[test]
    fn read_file_exactly_at_limit_succeeds() {
        let f = temp_file_with(b"hello");
        let result = read_file(f.path(), 5).expect("should succeed at limit");
        assert_eq!(result, "hello");
    }

    #[test]
    fn read_file_over_limit_reports_actual_size() {
        let f = temp_file_with(b"hello world");
        let err = read_file(f.path(), 4).expect_err("should fail");
        assert_eq!(err.exit_code(), 2);
        match err {
            CliError::FileTooLarge { actual, limit, .. } => {
                assert_eq!(actual, 11);
                assert_eq!(limit, 4);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn read_invalid_utf8_returns_error_with_offset() {
        let mut data = b"<a>".to_vec();
        data.push(0xFF);
        let f = temp_file_with(&data);
        let err = read_file(f.path(), 1024).expect_err("should fail on bad UTF-8");
        match err {
            CliError::InvalidUtf8 { byte_offset, .. } => assert_eq!(byte_offset, 3),
            other => panic!("expected InvalidUtf8, got {other:?}"),
        }
    }

    #[test]
    fn read_nonexistent_file_returns_file_not_found() {
        let err = read_file(Path::new("/no/such/file/ever.bpmn"), 1024).expect_err("should fail");
        assert!(matches!(err, CliError::FileNotFound { .. }));
    }

    // ── folders ──────────────────────────────────────────────────────────────

    #[test]
    fn list_bpmn_files_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.bpmn", "a.bpmn", "notes.txt", "c.bpmn2"] {
            std::fs::write(dir.path().join(name), "<x/>").expect("write");
        }
        std::fs::create_dir(dir.path().join("nested.bpmn")).expect("mkdir");
        let names = list_bpmn_files(dir.path()).expect("list");
        assert_eq!(names, vec!["a.bpmn", "b.bpmn"]);
    }

    #[test]
    fn list_missing_folder_fails() {
        let err = list_bpmn_files(Path::new("/no/such/folder")).expect_err("missing");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn require_dir_rejects_files() {
        let f = temp_file_with(b"x");
        let err = require_dir(f.path()).expect_err("file");
        assert!(matches!(err, CliError::NotADirectory { .. }));
    }

    // ── write_report ─────────────────────────────────────────────────────────

    #[test]
    fn write_report_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.xml");
        write_report(Some(&path), "<testResults/>").expect("write");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "<testResults/>"
        );
    }
}
