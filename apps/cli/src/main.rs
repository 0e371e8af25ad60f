//! LeadScout CLI: competitor achievement discovery for sales leads.
//!
//! Sweeps competitor video-production sites for client-showcase records,
//! stages single-URL extractions for human review, and converts stored
//! achievements into CRM pursuits.

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
