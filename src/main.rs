use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use fsdiff::FsdiffContext;
use fsdiff::cli::{Cli, Commands};
use fsdiff::commands::{self, EXIT_DIFFERENT, EXIT_ERROR, EXIT_SAME};
use fsdiff::output::{self, Verbosity};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let quiet = match &cli.command {
        Commands::Snapshot(args) => args.quiet,
        Commands::Diff(args) => args.quiet,
        _ => false,
    };
    output::set_verbosity(Verbosity::from_flags(quiet, cli.verbose));

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            process::exit(EXIT_ERROR);
        }
    }
}

/// Logs go to stderr: `FSDIFF_LOG` wins, then `--verbose` (debug), else warnings only.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FSDIFF_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Snapshot(args) => {
            let ctx = FsdiffContext::new()?;
            commands::snapshot::execute(&ctx, &args)?;
            Ok(EXIT_SAME)
        }
        Commands::Diff(args) => {
            let ctx = FsdiffContext::new()?;
            if args.nocolor || !ctx.config.output.color {
                colored::control::set_override(false);
            }
            let different = commands::diff::execute(&ctx, &args)?;
            Ok(if different { EXIT_DIFFERENT } else { EXIT_SAME })
        }
        Commands::Dump {
            snapshot,
            metadata_only,
        } => {
            commands::dump::execute(&snapshot, metadata_only)?;
            Ok(EXIT_SAME)
        }
        Commands::Completion { shell } => {
            print_completions(shell, &mut Cli::command());
            Ok(EXIT_SAME)
        }
    }
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
