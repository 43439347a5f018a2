//! CmdRx - AI diagnosis for command output
//!
//! Runs a command (or reads piped output), asks an LLM what went wrong,
//! and writes an analysis log plus a reviewable fix script.

use clap::Parser;
use cmdrx::cli;
use console::style;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level / --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = cli::run(cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        if let Some(hint) = cli::hint_for(&e) {
            eprintln!("{} {}", style("hint:").cyan(), hint);
        }
        std::process::exit(1);
    }
}
