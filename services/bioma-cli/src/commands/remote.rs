//! Commands that talk to an openEO backend.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bioma_common::{BoundingBox, SpatialExtent, TemporalExtent};
use openeo::{
    authenticate_with_recovery, ndvi_graph, rgb_graph, AuthMethod, BasicAuth, Collection,
    Connection, OidcAuth, ProcessGraph, RefreshTokenStore,
};
use tracing::{info, instrument};

use super::{ndvi, rgb, SweepReport};
use crate::cli::{BackendArgs, FetchArgs};
use crate::config::{AuthKind, BiomaConfig};
use crate::progress;

/// Product of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Ndvi,
    Rgb,
}

impl Product {
    pub fn job_title(&self) -> &'static str {
        match self {
            Product::Ndvi => "ndvi_time_series",
            Product::Rgb => "rgb_time_series",
        }
    }

    pub fn graph(
        &self,
        collection: &str,
        spatial: &SpatialExtent,
        temporal: &TemporalExtent,
        max_cloud_cover: f64,
    ) -> ProcessGraph {
        match self {
            Product::Ndvi => ndvi_graph(collection, spatial, temporal, max_cloud_cover),
            Product::Rgb => rgb_graph(collection, spatial, temporal, max_cloud_cover),
        }
    }
}

/// Token store from the command line, the config, or the per-user default.
pub fn token_store(explicit: Option<&Path>, config: &BiomaConfig) -> RefreshTokenStore {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| config.auth.token_store.clone())
        .unwrap_or_else(RefreshTokenStore::default_path);
    RefreshTokenStore::new(path)
}

/// The authentication method selected by flags and configuration.
pub fn auth_method(
    args: &BackendArgs,
    config: &BiomaConfig,
    store: &RefreshTokenStore,
) -> Result<Box<dyn AuthMethod>> {
    let auth = &config.auth;
    match args.auth.unwrap_or(auth.method) {
        AuthKind::Basic => {
            let username = args
                .username
                .clone()
                .or_else(|| auth.username.clone())
                .context("Basic authentication needs a username (OPENEO_USERNAME)")?;
            let password = args
                .password
                .clone()
                .or_else(|| auth.password.clone())
                .context("Basic authentication needs a password (OPENEO_PASSWORD)")?;
            Ok(Box::new(BasicAuth { username, password }))
        }
        AuthKind::Oidc => Ok(Box::new(OidcAuth {
            provider_id: auth.provider_id.clone(),
            client_id: args.client_id.clone().or_else(|| auth.client_id.clone()),
            client_secret: args
                .client_secret
                .clone()
                .or_else(|| auth.client_secret.clone()),
            store: Some(store.clone()),
            allow_device_flow: auth.device_flow && !args.no_device_flow,
            ..Default::default()
        })),
    }
}

/// Connect and authenticate, clearing stored tokens once if they are
/// rejected.
pub async fn login(args: &BackendArgs, config: &BiomaConfig) -> Result<Connection> {
    let url = args
        .backend
        .clone()
        .unwrap_or_else(|| config.backend.url.clone());
    let mut conn = Connection::connect(&url, &config.backend.client_config())
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;

    let store = token_store(None, config);
    let method = auth_method(args, config, &store)?;
    let recovery = (method.name() == "oidc").then_some(&store);
    authenticate_with_recovery(&mut conn, method.as_ref(), recovery)
        .await
        .context("Authentication failed")?;
    info!(root = %conn.root_url(), method = method.name(), "Authenticated");
    Ok(conn)
}

pub async fn collections(args: &BackendArgs, config: &BiomaConfig) -> Result<Vec<Collection>> {
    let url = args
        .backend
        .clone()
        .unwrap_or_else(|| config.backend.url.clone());
    let conn = Connection::connect(&url, &config.backend.client_config())
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;
    Ok(conn.list_collections().await?)
}

/// Delete the refresh-token store. Returns its path.
pub fn clear_tokens(explicit: Option<&Path>, config: &BiomaConfig) -> Result<PathBuf> {
    let store = token_store(explicit, config);
    store.remove()?;
    Ok(store.path().to_path_buf())
}

/// What a fetch downloaded and rendered.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub job_id: String,
    pub spatial: SpatialExtent,
    pub files: Vec<PathBuf>,
    pub rendered: SweepReport,
}

/// Area and window of a fetch, checked before anything goes over the wire.
pub fn fetch_extents(
    args: &FetchArgs,
    config: &BiomaConfig,
) -> Result<(SpatialExtent, TemporalExtent)> {
    let temporal = TemporalExtent::parse(&args.start, &args.end)?;
    let clamp = match &args.clamp {
        Some(text) => Some(BoundingBox::from_csv_str(text)?),
        None => config.aoi.clamp,
    };
    let spatial = vector::area_of_interest(&args.aoi, clamp.as_ref())
        .with_context(|| format!("No area of interest from {}", args.aoi.display()))?;
    Ok((spatial, temporal))
}

/// Run a batch job for the shapefile's area, download the GeoTIFFs and
/// render them.
///
/// NDVI results become colored maps. True colour results are first renamed
/// `RGB_YYYY-MM-DD.tif` from their DateTime tag.
#[instrument(skip_all, fields(product = ?product, output = %args.output.display()))]
pub async fn fetch(product: Product, args: &FetchArgs, config: &BiomaConfig) -> Result<FetchReport> {
    let (spatial, temporal) = fetch_extents(args, config)?;
    let max_cloud_cover = args
        .max_cloud_cover
        .unwrap_or(config.backend.max_cloud_cover);
    anyhow::ensure!(
        (0.0..=100.0).contains(&max_cloud_cover),
        "Cloud cover must be between 0 and 100, got {}",
        max_cloud_cover
    );
    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| config.backend.collection.clone());

    let conn = login(&args.backend, config).await?;
    let graph = product.graph(&collection, &spatial, &temporal, max_cloud_cover);
    let job_id = conn.create_job(&graph, product.job_title()).await?;
    info!(job_id = %job_id, temporal = %temporal, "Created batch job");

    let pb = progress::spinner(&format!("Waiting for job {}", job_id));
    let waited = conn.start_and_wait(&job_id, &config.job.poll_config()).await;
    pb.finish_and_clear();
    let job = waited?;
    info!(job_id = %job.id, status = %job.status, "Batch job finished");

    let files = conn
        .download_results(&job_id, &args.output, &config.job.retry_config())
        .await?;
    info!(count = files.len(), dir = %args.output.display(), "Downloaded results");

    let (files, rendered) = match product {
        Product::Ndvi => {
            let rendered = ndvi::render_dir(&args.output, &args.output, &config.render)?;
            (files, rendered)
        }
        Product::Rgb => {
            let renamed = rgb::rename_by_datetime(&args.output)?;
            (renamed, rgb::render_dir(&args.output, &args.output)?)
        }
    };

    Ok(FetchReport {
        job_id,
        spatial,
        files,
        rendered,
    })
}
