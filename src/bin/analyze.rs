//! Batch analyzer: read one capture log and print the attacker-behavior
//! report to stdout.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use portsnare::analysis::{report, Analysis};

#[derive(Parser, Debug)]
#[command(
    name = "portsnare-analyze",
    about = "Analyze a portsnare capture log and print attacker statistics"
)]
struct Cli {
    /// Path to a capture log file (one JSON record per line).
    log_file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let cli = Cli::parse();

    let analysis = Analysis::from_file(&cli.log_file)?;
    report::render(&analysis, &mut io::stdout().lock())?;

    Ok(())
}
