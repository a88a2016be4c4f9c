//! Subcommand implementations.
//!
//! Local tools are synchronous; only the openEO commands await.

pub mod geo;
pub mod ndvi;
pub mod products;
pub mod remote;
pub mod rgb;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::cli::{AuthCommand, Command, NdviCommand, RgbCommand, VectorCommand};
use crate::config::BiomaConfig;
use crate::progress;

/// Files converted and files skipped by a directory sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub converted: usize,
    pub failed: usize,
}

/// Apply `convert` to every item, logging failures and moving on.
pub(crate) fn sweep<T>(
    items: &[T],
    label: &str,
    key: impl Fn(&T) -> &Path,
    mut convert: impl FnMut(&T) -> Result<()>,
) -> SweepReport {
    let pb = progress::bar(items.len(), label);
    let mut report = SweepReport::default();
    for item in items {
        match convert(item) {
            Ok(()) => report.converted += 1,
            Err(e) => {
                report.failed += 1;
                pb.suspend(|| {
                    error!(path = %key(item).display(), error = %format!("{:#}", e), "Skipping file")
                });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(
        task = label,
        converted = report.converted,
        failed = report.failed,
        "Sweep finished"
    );
    report
}

/// `.tif`/`.tiff` files directly inside `dir`, sorted by name.
pub fn list_tiffs(dir: &Path) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| geotiff::is_tiff_path(p))
        .collect();
    files.sort();
    Ok(files)
}

/// `out_dir/<stem>.png` for an input image.
pub fn png_path_for(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out_dir.join(format!("{}.png", stem))
}

/// Run one parsed command.
pub async fn run(command: Command, config: &BiomaConfig) -> Result<()> {
    match command {
        Command::Ndvi { command } => match command {
            NdviCommand::Compute {
                nir,
                red,
                input,
                nir_band,
                red_band,
                output,
            } => {
                let source = match (input, nir, red) {
                    (Some(path), _, _) => ndvi::BandSource::Multiband {
                        path,
                        nir_band,
                        red_band,
                    },
                    (None, Some(nir), Some(red)) => ndvi::BandSource::Separate { nir, red },
                    _ => anyhow::bail!("Give either --input or both --nir and --red"),
                };
                ndvi::compute(&source, &output)
            }
            NdviCommand::Render { input, output } => {
                let output = output.unwrap_or_else(|| input.clone());
                ndvi::render_dir(&input, &output, &config.render)?;
                Ok(())
            }
            NdviCommand::Fetch(args) => {
                remote::fetch(remote::Product::Ndvi, &args, config).await?;
                Ok(())
            }
        },
        Command::Rgb { command } => match command {
            RgbCommand::Fetch(args) => {
                remote::fetch(remote::Product::Rgb, &args, config).await?;
                Ok(())
            }
            RgbCommand::Render { input, output } => {
                let output = output.unwrap_or_else(|| input.clone());
                rgb::render_dir(&input, &output)?;
                Ok(())
            }
        },
        Command::Combine {
            rgb,
            ndvi,
            output,
            title,
            factor,
        } => {
            let mut render = config.render.clone();
            if let Some(factor) = factor {
                anyhow::ensure!(factor >= 1, "--factor must be at least 1");
                render.compose_factor = factor;
            }
            products::combine(&rgb, &ndvi, &output, &title, &render)?;
            Ok(())
        }
        Command::Animate {
            input,
            output,
            title,
        } => {
            let title = title.unwrap_or_else(|| config.render.gif_title.clone());
            let (path, frames) = products::animate(&input, &output, &title, &config.render)?;
            println!("{} ({} frames)", path.display(), frames);
            Ok(())
        }
        Command::Timeseries {
            input,
            output,
            window,
            max_deviation,
            prominence,
            width,
        } => {
            let mut ts = config.timeseries.clone();
            ts.window = window.unwrap_or(ts.window);
            ts.max_deviation_pct = max_deviation.unwrap_or(ts.max_deviation_pct);
            ts.prominence = prominence.unwrap_or(ts.prominence);
            ts.width = width.unwrap_or(ts.width);
            let report = products::time_series(&input, &output, &ts, &config.render)?;
            for (date, event) in &report.events {
                println!("{}\t{}", date, event.label());
            }
            Ok(())
        }
        Command::Vector { command } => match command {
            VectorCommand::Bounds { path, crs } => {
                let b = geo::vector_bounds(&path, &crs)?;
                println!("{} {} {} {}", b.min_x, b.min_y, b.max_x, b.max_y);
                Ok(())
            }
            VectorCommand::Reproject { input, output, to } => {
                geo::vector_reproject(&input, &output, &to)?;
                Ok(())
            }
        },
        Command::Reproject { from, to, x, y } => {
            let (x, y) = geo::reproject_point(&from, &to, x, y)?;
            println!("{} {}", x, y);
            Ok(())
        }
        Command::Auth { command } => match command {
            AuthCommand::Login { backend } => {
                let conn = remote::login(&backend, config).await?;
                println!("Authenticated to {}", conn.root_url());
                Ok(())
            }
            AuthCommand::Clear { token_store } => {
                let path = remote::clear_tokens(token_store.as_deref(), config)?;
                println!("Cleared {}", path.display());
                Ok(())
            }
        },
        Command::Collections { backend } => {
            for c in remote::collections(&backend, config).await? {
                match c.title {
                    Some(title) => println!("{}\t{}", c.id, title),
                    None => println!("{}", c.id),
                }
            }
            Ok(())
        }
    }
}
