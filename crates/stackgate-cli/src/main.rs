//! # stackgate CLI Entry Point
//!
//! Parses arguments, installs logging, and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Pre-publish checks for stack templates.
#[derive(Parser, Debug)]
#[command(name = "stackgate", version, about)]
struct Cli {
    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate a stack template and write the errors log.
    Validate(stackgate_cli::validate::ValidateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Commands::Validate(args) => {
            let verdict = match stackgate_cli::validate::run_validate(&args) {
                Ok(verdict) => verdict,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    return ExitCode::from(2);
                }
            };
            if let Err(e) = stackgate_cli::validate::report(&verdict, &mut std::io::stdout().lock()) {
                eprintln!("error: {e}");
                return ExitCode::from(2);
            }
            ExitCode::from(verdict.exit_code())
        }
    }
}

// Logs go to stderr; stdout carries the report.
fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
