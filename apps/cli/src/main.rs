//! Prospector CLI: B2B lead discovery and enrichment.
//!
//! Finds companies matching a size/industry/location profile, enriches each
//! one with website insights and decision-maker contacts, drafts a
//! personalized outreach message, and saves the leads locally and to an
//! optional spreadsheet.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
