//! Implementation of `bpmn-compare compare <REFERENCE_DIR> <CANDIDATE_DIR>`.
//!
//! Pairs every `name.bpmn` in the reference folder with
//! `name-<variant>.bpmn` in each tool's candidate folder, compares the pairs
//! in parallel and writes one report.
//!
//! Exit codes:
//! - 0 = no significant differences
//! - 1 = at least one finding (including unreadable or malformed files)
//! - 2 = a folder, the configuration or the tool registry could not be loaded
use std::path::{Path, PathBuf};

use bpmn_compare_core::{
    EquivalenceConfig, MISSING_TEST_FILE, Output, Side, StructureValidator, TestResults,
    ToolRegistry, ValidationCollector, Variant, XmlValidator, candidate_file_name, compare,
    describe_difference, describe_parse_error, describe_unreadable,
};
use rayon::prelude::*;

use crate::OutputFormat;
use crate::error::CliError;
use crate::io::{list_bpmn_files, read_file, require_dir, write_report};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options of one `compare` invocation, minus the two folders.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Which candidate file suffix to look for.
    pub variant: Variant,
    /// Equivalence configuration file; `None` uses the built-in rules.
    pub config: Option<PathBuf>,
    /// Tool registry file; `None` treats the candidate folder as one tool.
    pub tools: Option<PathBuf>,
    /// Report destination; `None` writes to stdout.
    pub output: Option<PathBuf>,
    /// Run the structural validator on each candidate file.
    pub validate: bool,
    /// Report format.
    pub format: OutputFormat,
    /// Maximum size of any input file in bytes.
    pub max_file_size: u64,
}

/// One submission under test: a report label and the folder holding its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFolder {
    /// Tool section label, `"<tool> <version>"`.
    pub label: String,
    /// Folder with the candidate files.
    pub folder: PathBuf,
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Runs the `compare` command.
///
/// Loads the configuration and registry, compares every pair, writes the
/// report and maps the result onto an exit code.
///
/// # Errors
///
/// - [`CliError::ConfigInvalid`] / [`CliError::RegistryInvalid`]: the
///   configuration or registry is malformed.
/// - [`CliError::FileNotFound`] / [`CliError::NotADirectory`]: a folder
///   argument is unusable.
/// - [`CliError::DifferencesFound`]: the report holds at least one finding.
pub fn run(
    reference_dir: &Path,
    candidate_dir: &Path,
    options: &CompareOptions,
) -> Result<(), CliError> {
    let config = load_config(options.config.as_deref(), options.max_file_size)?;
    require_dir(reference_dir)?;
    require_dir(candidate_dir)?;
    let tools = resolve_tools(candidate_dir, options.tools.as_deref(), options.max_file_size)?;

    let results = compare_folders(reference_dir, &tools, &config, options)?;

    let rendered = render(&results, options.format)?;
    write_report(options.output.as_deref(), &rendered)?;

    let count = results.finding_count();
    tracing::info!(
        findings = count,
        infos = results.info_count(),
        "comparison finished"
    );
    if count > 0 {
        Err(CliError::DifferencesFound { count })
    } else {
        Ok(())
    }
}

/// Compares every reference file with each tool's candidate and collects
/// the outputs.
///
/// Pairs run in parallel; the returned tree renders deterministically.
///
/// # Errors
///
/// Returns [`CliError`] only when the reference folder cannot be listed.
/// Problems with individual files become outputs in the tree.
pub fn compare_folders(
    reference_dir: &Path,
    tools: &[ToolFolder],
    config: &EquivalenceConfig,
    options: &CompareOptions,
) -> Result<TestResults, CliError> {
    let references = list_bpmn_files(reference_dir)?;
    tracing::debug!(
        references = references.len(),
        tools = tools.len(),
        "discovered reference files"
    );

    let results = TestResults::new();
    let mut pairs: Vec<(&ToolFolder, &str)> = Vec::new();
    for tool in tools {
        if !tool.folder.is_dir() {
            tracing::warn!(tool = %tool.label, folder = %tool.folder.display(), "submission folder not found");
            results.record_tool(
                &tool.label,
                Output::Info(format!(
                    "Submission folder not found: {}",
                    tool.folder.display()
                )),
            );
            continue;
        }
        results.ensure_tool(&tool.label);
        pairs.extend(references.iter().map(|name| (tool, name.as_str())));
    }

    pairs.par_iter().for_each(|(tool, name)| {
        compare_pair(&results, reference_dir, tool, name, config, options);
    });

    Ok(results)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Loads the configuration file, or the built-in rules when none is given.
fn load_config(path: Option<&Path>, max_file_size: u64) -> Result<EquivalenceConfig, CliError> {
    match path {
        Some(path) => {
            let json = read_file(path, max_file_size)?;
            EquivalenceConfig::from_json(&json).map_err(|e| CliError::ConfigInvalid {
                source: path.display().to_string(),
                detail: e.to_string(),
            })
        }
        None => EquivalenceConfig::builtin().map_err(|e| CliError::ConfigInvalid {
            source: "built-in".to_owned(),
            detail: e.to_string(),
        }),
    }
}

/// Builds the list of tools under test.
///
/// With a registry each entry names a sub-folder of `candidate_dir`;
/// otherwise `candidate_dir` itself is the only tool, labelled by its name.
fn resolve_tools(
    candidate_dir: &Path,
    registry: Option<&Path>,
    max_file_size: u64,
) -> Result<Vec<ToolFolder>, CliError> {
    let Some(path) = registry else {
        let label = candidate_dir
            .file_name()
            .map_or_else(|| candidate_dir.display().to_string(), |n| n.to_string_lossy().into_owned());
        return Ok(vec![ToolFolder {
            label,
            folder: candidate_dir.to_path_buf(),
        }]);
    };

    let json = read_file(path, max_file_size)?;
    let registry = ToolRegistry::from_json(&json).map_err(|e| CliError::RegistryInvalid {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    Ok(registry
        .folder_names()
        .into_iter()
        .map(|label| ToolFolder {
            folder: candidate_dir.join(&label),
            label,
        })
        .collect())
}

/// Compares one reference file with one tool's candidate and records the
/// outcome under `(tool, name)`.
fn compare_pair(
    results: &TestResults,
    reference_dir: &Path,
    tool: &ToolFolder,
    name: &str,
    config: &EquivalenceConfig,
    options: &CompareOptions,
) {
    results.ensure_test(&tool.label, name);
    let record = |output: Output| results.record(&tool.label, name, output);

    let Some(candidate_name) = candidate_file_name(name, options.variant) else {
        return;
    };
    let candidate_path = tool.folder.join(&candidate_name);
    if !candidate_path.is_file() {
        tracing::info!(tool = %tool.label, test = name, candidate = %candidate_name, "candidate file missing");
        record(Output::Info(MISSING_TEST_FILE.to_owned()));
        return;
    }

    let reference = match read_file(&reference_dir.join(name), options.max_file_size) {
        Ok(text) => text,
        Err(e) => {
            record(Output::Finding(describe_unreadable(Side::Reference, &reason(&e))));
            return;
        }
    };
    let candidate = match read_file(&candidate_path, options.max_file_size) {
        Ok(text) => text,
        Err(e) => {
            record(Output::Finding(describe_unreadable(Side::Candidate, &reason(&e))));
            return;
        }
    };

    if options.validate {
        let mut collector = ValidationCollector::new();
        StructureValidator.validate(&candidate, &mut collector);
        for message in collector.messages() {
            record(Output::Info(format!("Validation: {message}")));
        }
    }

    match compare(&reference, &candidate, config) {
        Ok(comparison) => {
            tracing::info!(
                tool = %tool.label,
                test = name,
                raw = comparison.raw_count,
                findings = comparison.differences.len(),
                "compared pair"
            );
            for difference in &comparison.differences {
                record(Output::Finding(describe_difference(difference)));
            }
        }
        Err(e) => {
            tracing::warn!(tool = %tool.label, test = name, error = %e, "pair not comparable");
            record(Output::Finding(describe_parse_error(&e)));
        }
    }
}

/// The message of `e` without the `error: ` prefix.
fn reason(e: &CliError) -> String {
    let message = e.message();
    message
        .strip_prefix("error: ")
        .map_or_else(|| message.clone(), str::to_owned)
}

/// Renders the result tree in the requested format.
fn render(results: &TestResults, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Xml => Ok(results.render()),
        OutputFormat::Human => Ok(results.render_text()),
        OutputFormat::Json => serde_json::to_string_pretty(results)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|e| CliError::IoError {
                source: "report".to_owned(),
                detail: e.to_string(),
            }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
