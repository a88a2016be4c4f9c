//! Configuration for the bioma tools.
//!
//! Loaded from a YAML file (default `config/bioma.yaml`) with `${VAR}` and
//! `${VAR:-default}` substitution. Every section and field is optional;
//! command-line flags override what the file sets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bioma_common::BoundingBox;
use openeo::{ClientConfig, PollConfig, RetryConfig, DEFAULT_BACKEND, SENTINEL2_L2A};
use renderer::animation::AnimationOptions;
use renderer::compose::ComposeOptions;
use renderer::ndvi_map::NdviMapOptions;
use serde::Deserialize;
use timeseries::AnalysisParams;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "config/bioma.yaml";

pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BiomaConfig {
    pub logging: LoggingConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub job: JobConfig,
    pub aoi: AoiConfig,
    pub render: RenderConfig,
    pub timeseries: TimeSeriesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// openEO backend and the collection products are built from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub collection: String,
    /// Percent, 0 to 100.
    pub max_cloud_cover: f64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND.to_string(),
            collection: SENTINEL2_L2A.to_string(),
            max_cloud_cover: 15.0,
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
        }
    }
}

impl BackendConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    #[default]
    Oidc,
    Basic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub method: AuthKind,
    pub provider_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Refresh tokens; defaults to the per-user data directory.
    pub token_store: Option<PathBuf>,
    /// Fall back to the interactive device code flow.
    pub device_flow: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: AuthKind::Oidc,
            provider_id: None,
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            token_store: None,
            device_flow: true,
        }
    }
}

/// Batch job polling and result downloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub poll_initial_secs: u64,
    pub poll_max_secs: u64,
    pub max_wait_secs: u64,
    pub download_retries: u32,
    pub retry_initial_secs: u64,
    pub retry_max_secs: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_initial_secs: 5,
            poll_max_secs: 60,
            max_wait_secs: 6 * 3600,
            download_retries: 3,
            retry_initial_secs: 2,
            retry_max_secs: 60,
        }
    }
}

impl JobConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            initial_interval: Duration::from_secs(self.poll_initial_secs),
            max_interval: Duration::from_secs(self.poll_max_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.download_retries,
            initial_delay: Duration::from_secs(self.retry_initial_secs),
            max_delay: Duration::from_secs(self.retry_max_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AoiConfig {
    /// Lon/lat limits applied to the shapefile bounds.
    pub clamp: Option<BoundingBox>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// TrueType font for titles and labels; common system fonts otherwise.
    pub font: Option<PathBuf>,
    pub ndvi_min_size: u32,
    pub ndvi_font_size: f32,
    pub gif_title: String,
    pub gif_max_size: u32,
    pub fade_steps: u32,
    pub frame_delay_ms: u32,
    pub fade_delay_ms: u32,
    pub compose_factor: u32,
    pub header_ratio: f64,
    pub footer_ratio: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font: None,
            ndvi_min_size: 800,
            ndvi_font_size: 16.0,
            gif_title: "Biomass Analysis".to_string(),
            gif_max_size: 800,
            fade_steps: 20,
            frame_delay_ms: 2000,
            fade_delay_ms: 100,
            compose_factor: 2,
            header_ratio: 0.1,
            footer_ratio: 0.1,
        }
    }
}

impl RenderConfig {
    pub fn ndvi_options(&self) -> NdviMapOptions {
        NdviMapOptions {
            min_size: self.ndvi_min_size,
            font_size: self.ndvi_font_size,
            ..Default::default()
        }
    }

    pub fn compose_options(&self) -> ComposeOptions {
        ComposeOptions {
            factor: self.compose_factor,
            header_ratio: self.header_ratio,
            footer_ratio: self.footer_ratio,
        }
    }

    pub fn animation_options(&self) -> AnimationOptions {
        AnimationOptions {
            max_width: self.gif_max_size,
            max_height: self.gif_max_size,
            fade_steps: self.fade_steps,
            frame_delay_ms: self.frame_delay_ms,
            fade_delay_ms: self.fade_delay_ms,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeSeriesConfig {
    pub max_deviation_pct: f64,
    pub window: usize,
    pub prominence: f64,
    pub width: f64,
}

impl Default for TimeSeriesConfig {
    fn default() -> Self {
        let params = AnalysisParams::default();
        Self {
            max_deviation_pct: params.max_deviation_pct,
            window: params.window,
            prominence: params.min_prominence,
            width: params.min_width,
        }
    }
}

impl TimeSeriesConfig {
    pub fn analysis_params(&self) -> AnalysisParams {
        AnalysisParams {
            max_deviation_pct: self.max_deviation_pct,
            window: self.window,
            min_prominence: self.prominence,
            min_width: self.width,
            ..Default::default()
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load the configuration file.
///
/// Without an explicit path, a missing `config/bioma.yaml` yields the
/// defaults. An explicit path must exist.
pub fn load_config(path: Option<&Path>) -> Result<BiomaConfig> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    if !explicit && !path.exists() {
        debug!(path = %path.display(), "No configuration file, using defaults");
        return Ok(BiomaConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Expand variables, parse and validate YAML text.
pub fn parse_config(content: &str) -> Result<BiomaConfig> {
    let expanded = expand_env_vars(content)?;
    if expanded.trim().is_empty() {
        return Ok(BiomaConfig::default());
    }
    let config: BiomaConfig =
        serde_yaml::from_str(&expanded).context("Failed to parse config YAML")?;
    validate_config(&config)?;
    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Replace `${VAR}` and `${VAR:-default}` with values from the environment.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            out.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        let mut depth = 1;
        loop {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    expr.push('}');
                }
                Some(c) => expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", expr),
            }
        }
        out.push_str(&resolve_var(&expr)?);
    }

    Ok(out)
}

/// `VAR` must be set; `VAR:-default` falls back when unset or empty.
fn resolve_var(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr.trim())),
    }
}

// ============================================================================
// Validation
// ============================================================================

pub fn validate_config(config: &BiomaConfig) -> Result<()> {
    anyhow::ensure!(
        VALID_LOG_LEVELS.contains(&config.logging.level.as_str()),
        "Invalid log level: {}. Must be one of: {:?}",
        config.logging.level,
        VALID_LOG_LEVELS
    );
    anyhow::ensure!(
        VALID_LOG_FORMATS.contains(&config.logging.format.as_str()),
        "Invalid log format: {}. Must be one of: {:?}",
        config.logging.format,
        VALID_LOG_FORMATS
    );

    let backend = &config.backend;
    anyhow::ensure!(!backend.url.is_empty(), "backend.url cannot be empty");
    anyhow::ensure!(
        !backend.collection.is_empty(),
        "backend.collection cannot be empty"
    );
    anyhow::ensure!(
        (0.0..=100.0).contains(&backend.max_cloud_cover),
        "backend.max_cloud_cover must be between 0 and 100, got {}",
        backend.max_cloud_cover
    );

    let job = &config.job;
    anyhow::ensure!(
        job.poll_initial_secs > 0,
        "job.poll_initial_secs must be greater than 0"
    );
    anyhow::ensure!(
        job.poll_max_secs >= job.poll_initial_secs,
        "job.poll_max_secs must not be less than job.poll_initial_secs"
    );

    if let Some(clamp) = &config.aoi.clamp {
        anyhow::ensure!(
            clamp.min_x < clamp.max_x && clamp.min_y < clamp.max_y,
            "aoi.clamp must have min below max on both axes"
        );
    }

    let render = &config.render;
    anyhow::ensure!(
        render.compose_factor >= 1,
        "render.compose_factor must be at least 1"
    );
    anyhow::ensure!(render.gif_max_size > 0, "render.gif_max_size must be positive");
    for (name, ratio) in [
        ("render.header_ratio", render.header_ratio),
        ("render.footer_ratio", render.footer_ratio),
    ] {
        anyhow::ensure!(
            (0.0..1.0).contains(&ratio),
            "{} must be in [0, 1), got {}",
            name,
            ratio
        );
    }

    let ts = &config.timeseries;
    anyhow::ensure!(ts.window > 0, "timeseries.window must be at least 1");
    anyhow::ensure!(
        ts.max_deviation_pct >= 0.0,
        "timeseries.max_deviation_pct cannot be negative"
    );
    anyhow::ensure!(
        ts.prominence >= 0.0 && ts.width >= 0.0,
        "timeseries.prominence and timeseries.width cannot be negative"
    );

    Ok(())
}
