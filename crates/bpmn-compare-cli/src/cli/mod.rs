//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;

use bpmn_compare_core::Variant;
use clap::{Parser, Subcommand, ValueEnum};

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Report format written to stdout (or `--output`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// XML result tree: `testResults` > `tool` > `test` > `output`.
    Xml,
    /// The same tree as a single JSON document.
    Json,
    /// Indented plain text.
    Human,
}

// ---------------------------------------------------------------------------
// VariantArg
// ---------------------------------------------------------------------------

/// `--variant` values, mapped onto [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VariantArg {
    /// Candidate files are named `<name>-export.bpmn`.
    Export,
    /// Candidate files are named `<name>-roundtrip.bpmn`.
    Roundtrip,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Export => Self::Export,
            VariantArg::Roundtrip => Self::Roundtrip,
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// All subcommands of the `bpmn-compare` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Compare every reference model with the matching candidate submission.
    Compare {
        /// Folder holding the reference `.bpmn` files.
        #[arg(value_name = "REFERENCE_DIR")]
        reference_dir: PathBuf,
        /// Candidate folder, or the root of per-tool folders when `--tools` is given.
        #[arg(value_name = "CANDIDATE_DIR")]
        candidate_dir: PathBuf,
        /// How the candidates were produced; selects the candidate file suffix.
        #[arg(long, value_enum, default_value = "export")]
        variant: VariantArg,
        /// Equivalence configuration (JSON). Defaults to the built-in rules.
        #[arg(long, value_name = "FILE", env = "BPMN_COMPARE_CONFIG")]
        config: Option<PathBuf>,
        /// Tool registry (JSON) listing one candidate sub-folder per tool.
        #[arg(long, value_name = "FILE")]
        tools: Option<PathBuf>,
        /// Write the report to this file instead of stdout.
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
        /// Also run the structural validator on every candidate file.
        #[arg(long)]
        validate: bool,
    },

    /// Run the structural validator on one or more `.bpmn` files.
    Validate {
        /// Files to validate.
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

/// Root CLI struct for the `bpmn-compare` binary.
///
/// Global flags are marked `global = true` so that clap propagates them to
/// every subcommand.
#[derive(Parser)]
#[command(
    name = "bpmn-compare",
    version,
    about = "BPMN 2.0 model interchange comparison",
    long_about = "Compares BPMN 2.0 interchange files produced by modelling tools\n\
                  against reference models and reports the significant differences."
)]
pub struct Cli {
    /// Active subcommand.
    #[command(subcommand)]
    pub command: Command,

    /// Report format: xml (default), json or human.
    #[arg(long, short = 'f', default_value = "xml", global = true)]
    pub format: OutputFormat,

    /// Log errors only (incompatible with `--verbose`).
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log per-pair progress and filtering decisions (incompatible with `--quiet`).
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Maximum input file size in bytes.
    ///
    /// Can also be set via the `BPMN_COMPARE_MAX_FILE_SIZE` environment
    /// variable. Default: 67108864 (64 MB).
    #[arg(
        long,
        global = true,
        env = "BPMN_COMPARE_MAX_FILE_SIZE",
        default_value = "67108864"
    )]
    pub max_file_size: u64,
}

#[cfg(test)]
mod tests;
