//! Batch jobs: creation, polling and result download.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::StreamExt;
use reqwest::{header, Method};
use serde_json::json;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::connection::{check_response, Connection};
use crate::error::{OpenEoError, Result};
use crate::models::{JobInfo, JobResults, JobStatus, LogEntry, LogList};
use crate::process::ProcessGraph;

/// Metadata written next to the downloaded assets.
pub const RESULTS_METADATA: &str = "job-results.json";

/// Error log lines carried by a failed-job error.
const MAX_ERROR_LOGS: usize = 5;

/// Polling of a running job.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Give up after this long.
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            max_wait: Duration::from_secs(6 * 3600),
        }
    }
}

impl PollConfig {
    /// Interval after `current`: 1.5 times longer, capped.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(1.5).min(self.max_interval)
    }
}

/// Retries of one asset download.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Doubles after every failure.
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Job id from `OpenEO-Identifier`, else the last segment of `Location`.
fn job_id_from_headers(headers: &header::HeaderMap) -> Option<String> {
    if let Some(id) = headers.get("OpenEO-Identifier").and_then(|v| v.to_str().ok()) {
        return Some(id.to_string());
    }
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Keep only the file name part of an asset key.
fn asset_file_name(name: &str) -> Option<&str> {
    Path::new(name).file_name().and_then(|n| n.to_str())
}

impl Connection {
    /// `POST /jobs`. Returns the new job id.
    #[instrument(skip(self, graph))]
    pub async fn create_job(&self, graph: &ProcessGraph, title: &str) -> Result<String> {
        let body = json!({
            "title": title,
            "process": { "process_graph": graph },
        });
        let response = self
            .send(self.request(Method::POST, "/jobs").json(&body))
            .await?;
        let job_id = job_id_from_headers(response.headers()).ok_or_else(|| {
            OpenEoError::invalid_response("job created without OpenEO-Identifier or Location")
        })?;
        info!(job_id = %job_id, "Created batch job");
        Ok(job_id)
    }

    /// `POST /jobs/{id}/results` queues the job.
    pub async fn start_job(&self, job_id: &str) -> Result<()> {
        let path = format!("/jobs/{}/results", job_id);
        self.send(self.request(Method::POST, &path)).await?;
        info!(job_id, "Started batch job");
        Ok(())
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobInfo> {
        self.get_json(&format!("/jobs/{}", job_id)).await
    }

    pub async fn job_logs(&self, job_id: &str) -> Result<Vec<LogEntry>> {
        let list: LogList = self.get_json(&format!("/jobs/{}/logs", job_id)).await?;
        Ok(list.logs)
    }

    /// Start a job and poll until it finishes.
    ///
    /// A job ending in `error` or `canceled` fails with its last error logs.
    #[instrument(skip(self, poll))]
    pub async fn start_and_wait(&self, job_id: &str, poll: &PollConfig) -> Result<JobInfo> {
        self.start_job(job_id).await?;
        let started = Instant::now();
        let mut interval = poll.initial_interval;
        let mut last_status = None;

        loop {
            let info = self.job_status(job_id).await?;
            if last_status != Some(info.status) {
                info!(job_id, status = %info.status, progress = ?info.progress, "Job status");
                last_status = Some(info.status);
            } else {
                debug!(job_id, status = %info.status, progress = ?info.progress, "Job status");
            }

            match info.status {
                JobStatus::Finished => return Ok(info),
                JobStatus::Error | JobStatus::Canceled => {
                    let messages = self.error_messages(job_id).await;
                    return Err(OpenEoError::JobFailed {
                        job_id: job_id.to_string(),
                        status: info.status.to_string(),
                        messages,
                    });
                }
                _ => {}
            }

            if started.elapsed() >= poll.max_wait {
                return Err(OpenEoError::Timeout(format!(
                    "job {} still '{}' after {}s",
                    job_id,
                    info.status,
                    poll.max_wait.as_secs()
                )));
            }
            tokio::time::sleep(interval).await;
            interval = poll.next_interval(interval);
        }
    }

    /// Last error log messages, or nothing when logs are unavailable.
    async fn error_messages(&self, job_id: &str) -> Vec<String> {
        match self.job_logs(job_id).await {
            Ok(logs) => {
                let errors: Vec<String> = logs
                    .into_iter()
                    .filter(|l| l.level.eq_ignore_ascii_case("error"))
                    .map(|l| l.message)
                    .collect();
                let skip = errors.len().saturating_sub(MAX_ERROR_LOGS);
                errors.into_iter().skip(skip).collect()
            }
            Err(e) => {
                warn!(job_id, error = %e, "Could not fetch job logs");
                Vec::new()
            }
        }
    }

    /// `GET /jobs/{id}/results`, as parsed assets and the raw document.
    pub async fn job_results(&self, job_id: &str) -> Result<(JobResults, serde_json::Value)> {
        let raw: serde_json::Value = self.get_json(&format!("/jobs/{}/results", job_id)).await?;
        let results: JobResults = serde_json::from_value(raw.clone())?;
        Ok((results, raw))
    }

    /// Download every asset of a finished job into `dir`.
    ///
    /// Files go through `<name>.partial` and are renamed when complete; the
    /// results document is saved as `job-results.json`.
    #[instrument(skip(self, dir, retry), fields(dir = %dir.display()))]
    pub async fn download_results(
        &self,
        job_id: &str,
        dir: &Path,
        retry: &RetryConfig,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).await?;
        let (results, raw) = self.job_results(job_id).await?;
        if results.assets.is_empty() {
            warn!(job_id, "Job has no result assets");
        }

        let mut paths = Vec::with_capacity(results.assets.len());
        for (name, asset) in &results.assets {
            let Some(file_name) = asset_file_name(name) else {
                warn!(asset = %name, "Skipping asset with unusable name");
                continue;
            };
            let target = dir.join(file_name);
            self.download_with_retry(&asset.href, &target, retry).await?;
            paths.push(target);
        }

        fs::write(dir.join(RESULTS_METADATA), serde_json::to_vec_pretty(&raw)?).await?;
        info!(job_id, files = paths.len(), "Downloaded job results");
        Ok(paths)
    }

    async fn download_with_retry(&self, href: &str, target: &Path, retry: &RetryConfig) -> Result<()> {
        let mut delay = retry.initial_delay;
        let mut attempt = 0;
        loop {
            match self.download_file(href, target).await {
                Ok(bytes) => {
                    debug!(path = %target.display(), bytes, "Downloaded asset");
                    return Ok(());
                }
                Err(e) if attempt < retry.max_retries => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        retry = attempt,
                        max_retries = retry.max_retries,
                        delay_secs = delay.as_secs_f64(),
                        "Download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(retry.max_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Stream one asset to `target` through a `.partial` file.
    async fn download_file(&self, href: &str, target: &Path) -> Result<u64> {
        let mut partial = target.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        // Signed asset URLs on other hosts must not receive the token.
        let builder = self.client().get(href);
        let builder = if same_origin(href, self.root_url()) {
            self.authorize(builder)
        } else {
            builder
        };
        let response = check_response(builder.send().await?).await?;

        let mut file = fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        fs::rename(&partial, target).await?;
        Ok(written)
    }
}

/// Whether `href` points at the same scheme, host and port as `root`.
fn same_origin(href: &str, root: &str) -> bool {
    match (reqwest::Url::parse(href), reqwest::Url::parse(root)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_origin() {
        let root = "https://openeo.dataspace.copernicus.eu";
        assert!(same_origin("https://openeo.dataspace.copernicus.eu/openeo/1.2/jobs/j/results/a.tif", root));
        assert!(same_origin("https://openeo.dataspace.copernicus.eu:443/files/a.tif", root));
        assert!(!same_origin("https://openeo.dataspace.copernicus.eu.other.host/a.tif", root));
        assert!(!same_origin("http://openeo.dataspace.copernicus.eu/a.tif", root));
        assert!(!same_origin("https://s3.waw3-1.cloudferro.com/bucket/a.tif?sig=x", root));
        assert!(!same_origin("not a url", root));
        assert!(same_origin("http://127.0.0.1:4000/files/a.tif", "http://127.0.0.1:4000"));
        assert!(!same_origin("http://127.0.0.1:4001/files/a.tif", "http://127.0.0.1:4000"));
    }

    #[test]
    fn test_next_interval_grows_and_caps() {
        let poll = PollConfig {
            initial_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(20),
            max_wait: Duration::from_secs(100),
        };
        assert_eq!(poll.next_interval(Duration::from_secs(10)), Duration::from_secs(15));
        assert_eq!(poll.next_interval(Duration::from_secs(15)), Duration::from_secs(20));
    }

    #[test]
    fn test_job_id_from_headers() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::LOCATION, "https://b/openeo/1.2/jobs/j-42".parse().unwrap());
        assert_eq!(job_id_from_headers(&headers).as_deref(), Some("j-42"));
        headers.insert("OpenEO-Identifier", "j-7".parse().unwrap());
        assert_eq!(job_id_from_headers(&headers).as_deref(), Some("j-7"));
        assert_eq!(job_id_from_headers(&header::HeaderMap::new()), None);
    }

    #[test]
    fn test_asset_file_name() {
        assert_eq!(asset_file_name("openEO_2023-01-05Z.tif"), Some("openEO_2023-01-05Z.tif"));
        assert_eq!(asset_file_name("../x/openEO.tif"), Some("openEO.tif"));
    }
}
