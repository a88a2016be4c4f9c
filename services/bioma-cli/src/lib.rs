//! The `bioma` command-line tools.
//!
//! Each subcommand is a standalone tool: local NDVI and true colour
//! products, shapefile utilities, openEO batch downloads, composites,
//! animations and the NDVI time-series analysis.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod progress;

use anyhow::Result;

use crate::cli::Cli;
use crate::config::BiomaConfig;

/// Load the configuration named on the command line and apply the global
/// flags to it.
pub fn resolve_config(cli: &Cli) -> Result<BiomaConfig> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    if let Some(font) = &cli.font {
        config.render.font = Some(font.clone());
    }
    Ok(config)
}
