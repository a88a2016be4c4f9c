//! bioma: satellite biomass monitoring tools.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use bioma_cli::cli::Cli;
use bioma_cli::{commands, logging, resolve_config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    logging::init(&config.logging.level, &config.logging.format)?;
    debug!(
        backend = %config.backend.url,
        collection = %config.backend.collection,
        auth = ?config.auth.method,
        "Configuration loaded"
    );

    commands::run(cli.command, &config).await
}
