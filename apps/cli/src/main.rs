//! mdcc: Markdown Context Creator.
//!
//! Collects files matched by globs into one Markdown document, optionally
//! narrowing each file to matching lines and running per-file instructions
//! through an external command.

mod args;
mod commands;

use std::process::ExitCode;

use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let argv = args::expand_at_args(std::env::args())?;
    let cli = Cli::parse_grouped(argv).unwrap_or_else(|e| e.exit());
    commands::init_tracing(&cli);
    commands::run(cli).await
}
