mod cli;
mod cmd;
mod error;
mod io;

pub use cli::{Cli, Command, OutputFormat};

use clap::Parser;

use crate::cmd::compare::CompareOptions;
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    if let Err(e) = dispatch(cli) {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins over the `--quiet`/`--verbose` defaults.
fn init_tracing(quiet: bool, verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
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
            let options = CompareOptions {
                variant: variant.into(),
                config,
                tools,
                output,
                validate,
                format: cli.format,
                max_file_size: cli.max_file_size,
            };
            cmd::compare::run(&reference_dir, &candidate_dir, &options)
        }
        Command::Validate { files } => cmd::validate::run(&files, cli.format, cli.max_file_size),
    }
}
