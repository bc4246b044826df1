/// CLI error types with associated exit codes.
///
/// [`CliError`] is the top-level error type for the `bpmn-compare` binary.
/// Every variant maps to a stable exit code via [`CliError::exit_code`]:
///
/// - Exit code **2**: input failure. A folder, configuration or registry
///   could not be read or parsed, so no comparison ran.
/// - Exit code **1**: the run completed and found significant differences
///   or validation errors.
///
/// A single unreadable or malformed model file is not a `CliError`; it is
/// reported as a finding for its pair and the batch continues.
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CliError
// ---------------------------------------------------------------------------

/// All error conditions that the `bpmn-compare` CLI can produce.
#[derive(Debug)]
pub enum CliError {
    // --- Exit code 2: input failures ---
    /// A file or folder argument does not exist.
    FileNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The process lacks permission to read a path.
    PermissionDenied {
        /// The path that could not be read.
        path: PathBuf,
    },

    /// A folder argument names something that is not a directory.
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// A file exceeds the configured `--max-file-size` limit.
    FileTooLarge {
        /// The filesystem path, for display.
        source: String,
        /// The configured size limit in bytes.
        limit: u64,
        /// The actual size in bytes.
        actual: u64,
    },

    /// A file is not valid UTF-8.
    InvalidUtf8 {
        /// The filesystem path, for display.
        source: String,
        /// The byte offset of the first invalid byte sequence.
        byte_offset: usize,
    },

    /// A generic I/O error not covered by the variants above.
    IoError {
        /// The path or stream involved, for display.
        source: String,
        /// The underlying I/O error message.
        detail: String,
    },

    /// The equivalence configuration could not be loaded.
    ConfigInvalid {
        /// `"built-in"` or the configuration file path.
        source: String,
        /// What was wrong with it.
        detail: String,
    },

    /// The tool registry could not be loaded.
    RegistryInvalid {
        /// The registry file path.
        path: PathBuf,
        /// What was wrong with it.
        detail: String,
    },

    // --- Exit code 1: logical failures ---
    /// The comparison completed and recorded at least one finding.
    ///
    /// The report has already been written; this variant exists so `main`
    /// can exit with code 1.
    DifferencesFound {
        /// Number of findings in the report.
        count: usize,
    },

    /// At least one validated file has errors or fatal errors.
    ValidationErrors {
        /// Number of invalid files.
        invalid_files: usize,
    },
}

impl CliError {
    /// Returns the process exit code for this error.
    ///
    /// - `2`: input failure (missing folder, bad configuration, etc.).
    /// - `1`: findings or validation errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::NotADirectory { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidUtf8 { .. }
            | Self::IoError { .. }
            | Self::ConfigInvalid { .. }
            | Self::RegistryInvalid { .. } => 2,

            Self::DifferencesFound { .. } | Self::ValidationErrors { .. } => 1,
        }
    }

    /// Returns a human-readable error message suitable for printing to stderr.
    pub fn message(&self) -> String {
        match self {
            Self::FileNotFound { path } => {
                format!("error: not found: {}", path.display())
            }
            Self::PermissionDenied { path } => {
                format!("error: permission denied: {}", path.display())
            }
            Self::NotADirectory { path } => {
                format!("error: not a directory: {}", path.display())
            }
            Self::FileTooLarge {
                source,
                limit,
                actual,
            } => {
                format!("error: file too large: {source} is {actual} bytes, limit is {limit} bytes")
            }
            Self::InvalidUtf8 {
                source,
                byte_offset,
            } => {
                format!(
                    "error: invalid UTF-8 in {source}: first invalid byte at offset {byte_offset}"
                )
            }
            Self::IoError { source, detail } => {
                format!("error: I/O error on {source}: {detail}")
            }
            Self::ConfigInvalid { source, detail } => {
                format!("error: invalid equivalence configuration ({source}): {detail}")
            }
            Self::RegistryInvalid { path, detail } => {
                format!("error: invalid tool registry {}: {detail}", path.display())
            }
            Self::DifferencesFound { count } => {
                format!("error: {count} significant difference(s) found")
            }
            Self::ValidationErrors { invalid_files } => {
                format!("error: validation failed for {invalid_files} file(s)")
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for CliError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    // ── exit_code ────────────────────────────────────────────────────────────

    #[test]
    fn input_failures_are_exit_2() {
        let errors = [
            CliError::FileNotFound {
                path: PathBuf::from("refs"),
            },
            CliError::PermissionDenied {
                path: PathBuf::from("/root/refs"),
            },
            CliError::NotADirectory {
                path: PathBuf::from("a.bpmn"),
            },
            CliError::FileTooLarge {
                source: "big.bpmn".to_owned(),
                limit: 1024,
                actual: 2048,
            },
            CliError::InvalidUtf8 {
                source: "bad.bpmn".to_owned(),
                byte_offset: 42,
            },
            CliError::IoError {
                source: "out.xml".to_owned(),
                detail: "disk full".to_owned(),
            },
            CliError::ConfigInvalid {
                source: "rules.json".to_owned(),
                detail: "expected value".to_owned(),
            },
            CliError::RegistryInvalid {
                path: PathBuf::from("tools.json"),
                detail: "missing field `tools`".to_owned(),
            },
        ];
        for e in &errors {
            assert_eq!(e.exit_code(), 2, "{e}");
        }
    }

    #[test]
    fn differences_found_is_exit_1() {
        assert_eq!(CliError::DifferencesFound { count: 3 }.exit_code(), 1);
    }

    #[test]
    fn validation_errors_is_exit_1() {
        assert_eq!(CliError::ValidationErrors { invalid_files: 1 }.exit_code(), 1);
    }

    // ── message content ──────────────────────────────────────────────────────

    #[test]
    fn not_found_message_contains_path() {
        let e = CliError::FileNotFound {
            path: PathBuf::from("models/reference"),
        };
        assert!(e.message().contains("models/reference"));
        assert!(e.message().starts_with("error:"));
    }

    #[test]
    fn file_too_large_message_has_both_sizes() {
        let e = CliError::FileTooLarge {
            source: "big.bpmn".to_owned(),
            limit: 100,
            actual: 200,
        };
        let msg = e.message();
        assert!(msg.contains("100"), "{msg}");
        assert!(msg.contains("200"), "{msg}");
    }

    #[test]
    fn invalid_utf8_message_has_offset() {
        let e = CliError::InvalidUtf8 {
            source: "bad.bpmn".to_owned(),
            byte_offset: 7,
        };
        assert!(e.message().contains("offset 7"));
    }

    #[test]
    fn config_message_names_source() {
        let e = CliError::ConfigInvalid {
            source: "rules.json".to_owned(),
            detail: "unknown field `ignored`".to_owned(),
        };
        let msg = e.message();
        assert!(msg.contains("rules.json"), "{msg}");
        assert!(msg.contains("unknown field"), "{msg}");
    }

    #[test]
    fn display_matches_message() {
        let e = CliError::DifferencesFound { count: 2 };
        assert_eq!(e.to_string(), e.message());
        assert!(e.message().contains('2'));
    }
}
