//! JSON documents exchanged with an openEO backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// `/.well-known/openeo` discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct WellKnown {
    pub versions: Vec<ApiVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiVersion {
    pub url: String,
    pub api_version: String,
    #[serde(default = "default_production")]
    pub production: bool,
}

fn default_production() -> bool {
    true
}

impl WellKnown {
    /// Highest API version flagged for production.
    pub fn best_production(&self) -> Option<&ApiVersion> {
        self.versions
            .iter()
            .filter(|v| v.production)
            .max_by(|a, b| version_key(&a.api_version).cmp(&version_key(&b.api_version)))
    }
}

/// Numeric components of a `1.2.0` version string; other parts count as 0.
pub fn version_key(version: &str) -> Vec<u32> {
    version
        .split('.')
        .map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}

/// `GET /` capabilities.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Capabilities {
    pub api_version: String,
    #[serde(default)]
    pub backend_version: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Endpoint {
    pub path: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

impl Capabilities {
    pub fn supports(&self, method: &str, path: &str) -> bool {
        self.endpoints.iter().any(|e| {
            e.path == path && e.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CollectionList {
    pub collections: Vec<Collection>,
}

/// `{id, code, message}` error document.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub id: Option<String>,
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Queued,
    Running,
    Canceled,
    Finished,
    Error,
}

impl JobStatus {
    /// The job will not change state anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Canceled | JobStatus::Finished | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Canceled => "canceled",
            JobStatus::Finished => "finished",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /jobs/{id}` metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobInfo {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LogList {
    pub logs: Vec<LogEntry>,
}

/// One downloadable file of a finished job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// `GET /jobs/{id}/results`. Assets are keyed by file name.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobResults {
    #[serde(default)]
    pub assets: BTreeMap<String, Asset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_production_version() {
        let doc: WellKnown = serde_json::from_str(
            r#"{"versions": [
                {"url": "https://b/openeo/1.0", "api_version": "1.0.1"},
                {"url": "https://b/openeo/1.2", "api_version": "1.2.0", "production": true},
                {"url": "https://b/openeo/1.10", "api_version": "1.10.0-rc.1", "production": false}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.best_production().unwrap().url, "https://b/openeo/1.2");
    }

    #[test]
    fn test_version_key_orders_numerically() {
        assert!(version_key("1.10.0") > version_key("1.2.0"));
        assert_eq!(version_key("1.2.0-rc1"), vec![1, 2, 0]);
    }

    #[test]
    fn test_job_status_parsing() {
        let info: JobInfo =
            serde_json::from_str(r#"{"id": "j-1", "status": "running", "progress": 40}"#).unwrap();
        assert_eq!(info.status, JobStatus::Running);
        assert!(!info.status.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }
}
