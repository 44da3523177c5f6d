//! # dte CLI entry point
//!
//! Parses command-line arguments, sets up logging and dispatches to the
//! subcommand handlers in the library.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dte_cli::explain::{run_explain, ExplainArgs};
use dte_cli::f14::{run_f14, F14Args};
use dte_cli::process::{run_process, ProcessArgs};
use dte_cli::summary::{run_summary, SummaryArgs};
use dte_cli::validate::{run_validate, ValidateArgs};

/// Electronic tax document (DTE) toolchain.
///
/// Validates, signs and transmits documents to the tax authority, falls
/// back to offline contingency when it is unreachable, and keeps the
/// monthly VAT books.
#[derive(Parser, Debug)]
#[command(name = "dte", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a document against the schema and the totals rules.
    Validate(ValidateArgs),

    /// Validate, sign and transmit a document, or book a received one.
    Process(ProcessArgs),

    /// Explain an authority or pipeline error code.
    Explain(ExplainArgs),

    /// Compute the F14 advance payment for a period.
    F14(F14Args),

    /// Accumulated totals for a business and year.
    Summary(SummaryArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Process(args) => run_process(&args),
        Commands::Explain(args) => run_explain(&args),
        Commands::F14(args) => run_f14(&args),
        Commands::Summary(args) => run_summary(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
