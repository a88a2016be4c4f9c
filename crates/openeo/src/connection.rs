//! Backend connection: discovery, capabilities and authenticated requests.

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::error::{OpenEoError, Result};
use crate::models::{ApiErrorBody, Capabilities, Collection, CollectionList, WellKnown};

/// Copernicus Data Space Ecosystem openEO federation.
pub const DEFAULT_BACKEND: &str = "https://openeo.dataspace.copernicus.eu";

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
        }
    }
}

/// A connection to one openEO API root.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    root: String,
    capabilities: Capabilities,
    bearer: Option<String>,
}

/// Add `https://` to bare host names and drop trailing slashes.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

impl Connection {
    /// Discover the API root of `url` and load its capabilities.
    ///
    /// When `/.well-known/openeo` lists versions, the highest production one
    /// is used; otherwise `url` itself is taken as the API root.
    #[instrument(skip(config))]
    pub async fn connect(url: &str, config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("bioma/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base = normalize_url(url);
        let root = match discover(&client, &base).await {
            Some(root) => root,
            None => {
                debug!(url = %base, "No usable discovery document, using URL as API root");
                base
            }
        };

        let response = check_response(client.get(format!("{}/", root)).send().await?).await?;
        let capabilities: Capabilities = response.json().await?;
        info!(
            root = %root,
            api_version = %capabilities.api_version,
            backend = capabilities.title.as_deref().unwrap_or("unknown"),
            "Connected to openEO backend"
        );

        Ok(Self {
            client,
            root,
            capabilities,
            bearer: None,
        })
    }

    pub fn root_url(&self) -> &str {
        &self.root
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn set_bearer(&mut self, bearer: Option<String>) {
        self.bearer = bearer;
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer.is_some()
    }

    /// Absolute URL of an API path (`/jobs`).
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }

    /// Request to an API path, with the bearer token when authenticated.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorize(self.client.request(method, self.url(path)))
    }

    pub(crate) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Send and map non-2xx answers to [`OpenEoError::Api`].
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        check_response(builder.send().await?).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    /// `GET /collections`.
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        let list: CollectionList = self.get_json("/collections").await?;
        Ok(list.collections)
    }

    /// `GET /me`, which only succeeds with valid credentials.
    pub async fn describe_account(&self) -> Result<serde_json::Value> {
        self.get_json("/me").await
    }
}

async fn discover(client: &Client, base: &str) -> Option<String> {
    let url = format!("{}/.well-known/openeo", base);
    let response = match client.get(&url).send().await {
        Ok(r) if r.status().is_success() => r,
        Ok(r) => {
            debug!(status = r.status().as_u16(), "Discovery not available");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Discovery request failed");
            return None;
        }
    };
    let doc: WellKnown = match response.json().await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "Invalid discovery document");
            return None;
        }
    };
    let best = doc.best_production()?;
    debug!(api_version = %best.api_version, url = %best.url, "Selected API version");
    Some(best.url.trim_end_matches('/').to_string())
}

/// Pass 2xx responses through; turn others into API errors.
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => OpenEoError::Api {
            status: status.as_u16(),
            code: body.code,
            message: body.message,
            id: body.id,
        },
        Err(_) => OpenEoError::Api {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("HTTPError").to_string(),
            message: text,
            id: None,
        },
    };
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("openeo.dataspace.copernicus.eu"),
            "https://openeo.dataspace.copernicus.eu"
        );
        assert_eq!(normalize_url("http://localhost:8080/"), "http://localhost:8080");
    }
}
