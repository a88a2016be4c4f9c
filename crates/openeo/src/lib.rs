//! Minimal openEO API client.
//!
//! Covers what the bioma tools need from a backend:
//! - discovery (`/.well-known/openeo`) and capabilities
//! - basic and OIDC authentication, with refresh tokens kept on disk
//! - process graphs for Sentinel-2 NDVI and true colour products
//! - batch jobs: create, start, poll, download results

pub mod auth;
pub mod connection;
pub mod error;
pub mod jobs;
pub mod models;
pub mod process;
pub mod token_store;

pub use auth::{authenticate_with_recovery, AuthMethod, BasicAuth, OidcAuth};
pub use connection::{ClientConfig, Connection, DEFAULT_BACKEND};
pub use error::{OpenEoError, Result};
pub use jobs::{PollConfig, RetryConfig, RESULTS_METADATA};
pub use models::{Capabilities, Collection, JobInfo, JobResults, JobStatus};
pub use process::{ndvi_graph, rgb_graph, ProcessGraph, ProcessGraphBuilder, SENTINEL2_L2A};
pub use token_store::RefreshTokenStore;
