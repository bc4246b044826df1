//! Implementation of `bpmn-compare validate <FILE>...`.
//!
//! Runs the built-in structural validator on each file and prints the event
//! counts and messages per file. `--format json` prints one JSON object per
//! file (NDJSON); the other formats print plain text.
//!
//! Exit codes:
//! - 0 = every file is valid (warnings allowed)
//! - 1 = at least one file has errors or fatal errors
//! - 2 = a file could not be read
use std::io::Write;
use std::path::{Path, PathBuf};

use bpmn_compare_core::{StructureValidator, ValidationCollector, XmlValidator};

use crate::OutputFormat;
use crate::error::CliError;
use crate::io::read_file;

/// Runs the `validate` command.
///
/// # Errors
///
/// - [`CliError::FileNotFound`] and the other input errors: a file could not
///   be read.
/// - [`CliError::ValidationErrors`]: one or more files are invalid.
pub fn run(files: &[PathBuf], format: OutputFormat, max_file_size: u64) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut invalid_files = 0;

    for path in files {
        let xml = read_file(path, max_file_size)?;
        let mut collector = ValidationCollector::new();
        StructureValidator.validate(&xml, &mut collector);
        if !collector.is_valid() {
            invalid_files += 1;
        }
        write_result(&mut out, path, &collector, format).map_err(|e| CliError::IoError {
            source: "stdout".to_owned(),
            detail: e.to_string(),
        })?;
    }

    if invalid_files > 0 {
        Err(CliError::ValidationErrors { invalid_files })
    } else {
        Ok(())
    }
}

/// Writes the result for one file.
fn write_result<W: Write>(
    writer: &mut W,
    path: &Path,
    collector: &ValidationCollector,
    format: OutputFormat,
) -> std::io::Result<()> {
    let summary = collector.summary();
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "file": path.display().to_string(),
                "valid": summary.is_valid(),
                "warnings": summary.warnings,
                "errors": summary.errors,
                "fatal_errors": summary.fatal_errors,
                "messages": collector.messages(),
            });
            writeln!(writer, "{value}")
        }
        OutputFormat::Xml | OutputFormat::Human => {
            writeln!(
                writer,
                "{}: {} warning(s), {} error(s), {} fatal error(s)",
                path.display(),
                summary.warnings,
                summary.errors,
                summary.fatal_errors
            )?;
            for message in collector.messages() {
                writeln!(writer, "  {message}")?;
            }
            Ok(())
        }
    }
}
