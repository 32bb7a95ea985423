//! imchef CLI: curriculum content-ingestion chef.
//!
//! Walks the Illustrative Mathematics content API and writes an importable
//! channel tree of topics and documents.

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
