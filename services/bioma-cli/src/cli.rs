//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{AuthKind, VALID_LOG_FORMATS, VALID_LOG_LEVELS};

#[derive(Parser, Debug)]
#[command(name = "bioma")]
#[command(version, about = "Satellite biomass monitoring: NDVI, true colour, animations and time series")]
pub struct Cli {
    /// Configuration file (default: config/bioma.yaml when present)
    #[arg(long, env = "BIOMA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level; RUST_LOG takes precedence
    #[arg(long, global = true, value_parser = VALID_LOG_LEVELS)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_parser = VALID_LOG_FORMATS)]
    pub log_format: Option<String>,

    /// TrueType font used for titles and labels
    #[arg(long, global = true)]
    pub font: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vegetation index products
    Ndvi {
        #[command(subcommand)]
        command: NdviCommand,
    },
    /// True colour products
    Rgb {
        #[command(subcommand)]
        command: RgbCommand,
    },
    /// Side-by-side RGB / NDVI composites with a title and the image date
    Combine {
        /// Directory of true colour PNGs
        #[arg(long)]
        rgb: PathBuf,
        /// Directory of NDVI PNGs
        #[arg(long)]
        ndvi: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        title: String,
        /// Integer enlargement applied to both images
        #[arg(long)]
        factor: Option<u32>,
    },
    /// Animated GIF with fades from a directory of PNGs
    Animate {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// NDVI time series: CSV tables and a chart of growth and cut events
    Timeseries {
        /// Directory of NDVI GeoTIFFs named like openEO_YYYY-MM-DDZ.tif
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Rolling mean window, in samples
        #[arg(long)]
        window: Option<usize>,
        /// Drop samples changing more than this percentage
        #[arg(long)]
        max_deviation: Option<f64>,
        /// Minimum peak prominence
        #[arg(long)]
        prominence: Option<f64>,
        /// Minimum peak width, in samples
        #[arg(long)]
        width: Option<f64>,
    },
    /// Shapefile tools
    Vector {
        #[command(subcommand)]
        command: VectorCommand,
    },
    /// Transform one coordinate between reference systems
    #[command(allow_negative_numbers = true)]
    Reproject {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        x: f64,
        y: f64,
    },
    /// openEO credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
    /// List the collections offered by the backend
    Collections {
        #[command(flatten)]
        backend: BackendArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum NdviCommand {
    /// Compute NDVI from local bands into a Float32 GeoTIFF
    Compute {
        /// Near-infrared band file
        #[arg(long, requires = "red", conflicts_with = "input")]
        nir: Option<PathBuf>,
        /// Red band file
        #[arg(long, requires = "nir", conflicts_with = "input")]
        red: Option<PathBuf>,
        /// One multi-band file holding both bands
        #[arg(long)]
        input: Option<PathBuf>,
        /// 1-based NIR band in --input (B08 of a B08,B04 download)
        #[arg(long, default_value = "1")]
        nir_band: usize,
        /// 1-based red band in --input
        #[arg(long, default_value = "2")]
        red_band: usize,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Colored NDVI map for every GeoTIFF in a directory
    Render {
        input: PathBuf,
        /// Defaults to the input directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run an NDVI batch job for a shapefile's area, download and render it
    Fetch(FetchArgs),
}

#[derive(Subcommand, Debug)]
pub enum RgbCommand {
    /// Run a true colour batch job, name files by date and render PNGs
    Fetch(FetchArgs),
    /// PNG for every GeoTIFF in a directory
    Render {
        input: PathBuf,
        /// Defaults to the input directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum VectorCommand {
    /// Print the total bounds of a shapefile
    Bounds {
        /// A .shp file or a directory holding one
        path: PathBuf,
        #[arg(long, default_value = "EPSG:4326")]
        crs: String,
    },
    /// Write a copy of a shapefile in another reference system
    Reproject {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Authenticate and keep the refresh token
    Login {
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Remove stored refresh tokens
    Clear {
        #[arg(long)]
        token_store: Option<PathBuf>,
    },
}

/// Backend selection and credentials.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// openEO backend URL
    #[arg(long, env = "OPENEO_URL")]
    pub backend: Option<String>,

    #[arg(long, value_enum)]
    pub auth: Option<AuthKind>,

    #[arg(long, env = "OPENEO_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "OPENEO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "OPENEO_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "OPENEO_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Fail instead of starting the interactive device login
    #[arg(long)]
    pub no_device_flow: bool,
}

/// Area, window and destination of a batch job.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// A .shp file or a directory holding one
    #[arg(long)]
    pub aoi: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub start: String,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    pub end: String,

    /// Percent
    #[arg(long)]
    pub max_cloud_cover: Option<f64>,

    /// Limit the area: west,south,east,north in degrees
    #[arg(long)]
    pub clamp: Option<String>,

    #[arg(long)]
    pub collection: Option<String>,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reproject_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "bioma", "reproject", "--from", "EPSG:4326", "--to", "EPSG:31983", "-47.5", "-15.8",
        ])
        .unwrap();
        match cli.command {
            Command::Reproject { from, to, x, y } => {
                assert_eq!(from, "EPSG:4326");
                assert_eq!(to, "EPSG:31983");
                assert_eq!((x, y), (-47.5, -15.8));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_ndvi_compute_modes() {
        let cli = Cli::try_parse_from([
            "bioma", "ndvi", "compute", "--input", "s2.tif", "--nir-band", "4", "--red-band", "3",
            "-o", "ndvi.tif",
        ])
        .unwrap();
        match cli.command {
            Command::Ndvi {
                command:
                    NdviCommand::Compute {
                        input,
                        nir_band,
                        red_band,
                        nir,
                        ..
                    },
            } => {
                assert_eq!(input, Some(PathBuf::from("s2.tif")));
                assert_eq!((nir_band, red_band), (4, 3));
                assert!(nir.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }

        // --nir without --red is rejected.
        assert!(Cli::try_parse_from(["bioma", "ndvi", "compute", "--nir", "a.tif", "-o", "o.tif"]).is_err());
        assert!(Cli::try_parse_from([
            "bioma", "ndvi", "compute", "--nir", "a.tif", "--red", "b.tif", "--input", "c.tif", "-o",
            "o.tif",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_fetch_and_global_flags() {
        let cli = Cli::try_parse_from([
            "bioma", "rgb", "fetch", "--aoi", "fields", "-o", "out", "--start", "2023-01-01",
            "--end", "2023-06-30", "--auth", "basic", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Rgb {
                command: RgbCommand::Fetch(args),
            } => {
                assert_eq!(args.aoi, PathBuf::from("fields"));
                assert_eq!(args.backend.auth, Some(AuthKind::Basic));
                assert_eq!(args.start, "2023-01-01");
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["bioma", "--log-level", "loud", "collections"]).is_err());
    }
}
