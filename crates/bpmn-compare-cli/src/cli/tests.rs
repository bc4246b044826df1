#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::wildcard_enum_match_arm)]

use clap::CommandFactory;

use super::*;

/// The root help output must list both subcommands.
#[test]
fn test_root_help_lists_all_subcommands() {
    let mut cmd = Cli::command();
    let help = format!("{}", cmd.render_help());
    for name in ["compare", "validate"] {
        assert!(
            help.contains(name),
            "root help should mention subcommand '{name}'"
        );
    }
}

/// The root help output must describe every global flag.
#[test]
fn test_root_help_lists_global_flags() {
    let mut cmd = Cli::command();
    let help = format!("{}", cmd.render_help());
    for flag in [
        "--format",
        "--quiet",
        "--verbose",
        "--max-file-size",
        "--help",
        "--version",
    ] {
        assert!(
            help.contains(flag),
            "root help should mention flag '{flag}'"
        );
    }
}

/// `bpmn-compare compare --help` must mention its options.
#[test]
fn test_compare_help() {
    let mut cmd = Cli::command();
    let sub = cmd
        .find_subcommand_mut("compare")
        .expect("compare subcommand should exist");
    let help = format!("{}", sub.render_help());
    for needle in [
        "REFERENCE_DIR",
        "CANDIDATE_DIR",
        "--variant",
        "--config",
        "--tools",
        "--output",
        "--validate",
    ] {
        assert!(help.contains(needle), "compare help should mention {needle}");
    }
}

/// The clap definition passes clap's own consistency checks.
#[test]
fn test_cli_debug_assert() {
    Cli::command().debug_assert();
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn test_compare_defaults() {
    let cli = Cli::try_parse_from(["bpmn-compare", "compare", "ref", "cand"]).expect("parse");
    assert_eq!(cli.format, OutputFormat::Xml);
    assert!(!cli.quiet);
    match cli.command {
        Command::Compare {
            reference_dir,
            candidate_dir,
            variant,
            config,
            tools,
            output,
            validate,
        } => {
            assert_eq!(reference_dir, PathBuf::from("ref"));
            assert_eq!(candidate_dir, PathBuf::from("cand"));
            assert_eq!(variant, VariantArg::Export);
            assert!(config.is_none() || std::env::var_os("BPMN_COMPARE_CONFIG").is_some());
            assert!(tools.is_none());
            assert!(output.is_none());
            assert!(!validate);
        }
        _ => panic!("expected compare"),
    }
}

#[test]
fn test_compare_variant_and_global_format_after_subcommand() {
    let cli = Cli::try_parse_from([
        "bpmn-compare",
        "compare",
        "ref",
        "cand",
        "--variant",
        "roundtrip",
        "--format",
        "json",
    ])
    .expect("parse");
    assert_eq!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Compare { variant, .. } => {
            assert_eq!(Variant::from(variant), Variant::Roundtrip);
        }
        _ => panic!("expected compare"),
    }
}

#[test]
fn test_unknown_variant_is_rejected() {
    let result = Cli::try_parse_from([
        "bpmn-compare",
        "compare",
        "ref",
        "cand",
        "--variant",
        "import",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_from(["bpmn-compare", "-q", "-v", "validate", "a.bpmn"]);
    assert!(result.is_err());
}

#[test]
fn test_validate_requires_a_file() {
    assert!(Cli::try_parse_from(["bpmn-compare", "validate"]).is_err());
    let cli = Cli::try_parse_from(["bpmn-compare", "validate", "a.bpmn", "b.bpmn"]).expect("parse");
    match cli.command {
        Command::Validate { files } => assert_eq!(files.len(), 2),
        _ => panic!("expected validate"),
    }
}
