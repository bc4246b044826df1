/// Command implementations for the `bpmn-compare` CLI.
///
/// Each submodule implements one subcommand. The `run` function in each
/// submodule receives parsed arguments and returns `Ok(())` or a [`crate::error::CliError`].
pub mod compare;
pub mod validate;
