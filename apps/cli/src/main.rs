//! herbgraph CLI: builds a herbal-medicine knowledge graph.
//!
//! Scrapes herb listings and taxonomy infoboxes, then loads herbs, diseases
//! and taxa into a Neo4j graph with idempotent writes.

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
