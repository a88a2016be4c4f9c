//! Authentication: HTTP basic and OpenID Connect.
//!
//! Every method produces the bearer token expected by openEO backends:
//! `basic//{token}` or `oidc/{provider_id}/{access_token}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use reqwest::{Client, Method};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::connection::{check_response, Connection};
use crate::error::{OpenEoError, Result};
use crate::token_store::RefreshTokenStore;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Added to the polling interval on `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);
const DEFAULT_DEVICE_INTERVAL: u64 = 5;

/// A way of obtaining a bearer token for a connection.
#[async_trait]
pub trait AuthMethod: Send + Sync {
    async fn authenticate(&self, conn: &Connection) -> Result<String>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// `GET /credentials/basic` with a username and password.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
struct BasicToken {
    access_token: String,
}

#[async_trait]
impl AuthMethod for BasicAuth {
    async fn authenticate(&self, conn: &Connection) -> Result<String> {
        let request = conn
            .request(Method::GET, "/credentials/basic")
            .basic_auth(&self.username, Some(&self.password));
        let token: BasicToken = conn.send(request).await?.json().await?;
        info!(username = %self.username, "Authenticated with basic credentials");
        Ok(format!("basic//{}", token.access_token))
    }

    fn name(&self) -> &'static str {
        "basic"
    }
}

// ============================================================================
// OIDC
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OidcProvider {
    pub id: String,
    pub issuer: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub default_clients: Vec<DefaultClient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultClient {
    pub id: String,
    #[serde(default)]
    pub grant_types: Vec<String>,
}

#[derive(Deserialize)]
struct ProviderList {
    providers: Vec<OidcProvider>,
}

/// Subset of the issuer's `/.well-known/openid-configuration`.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcEndpoints {
    pub token_endpoint: String,
    #[serde(default)]
    pub device_authorization_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Answer of the device authorization endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    #[serde(default)]
    pub interval: Option<u64>,
    pub expires_in: u64,
}

/// Tell the user where to log in.
fn print_device_prompt(device: &DeviceAuthorization) {
    match &device.verification_uri_complete {
        Some(uri) => eprintln!("Visit {} to authorize this device.", uri),
        None => eprintln!(
            "Visit {} and enter the code {} to authorize this device.",
            device.verification_uri, device.user_code
        ),
    }
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_verifier(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// OpenID Connect authentication.
///
/// Grants are tried in order: stored refresh token, client credentials
/// (when a secret is set), then the device code flow with PKCE.
pub struct OidcAuth {
    pub provider_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub store: Option<RefreshTokenStore>,
    /// Disable to fail instead of prompting the user.
    pub allow_device_flow: bool,
    pub prompt: fn(&DeviceAuthorization),
}

impl Default for OidcAuth {
    fn default() -> Self {
        Self {
            provider_id: None,
            client_id: None,
            client_secret: None,
            store: None,
            allow_device_flow: true,
            prompt: print_device_prompt,
        }
    }
}

impl std::fmt::Debug for OidcAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcAuth")
            .field("provider_id", &self.provider_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("store", &self.store)
            .finish()
    }
}

impl OidcAuth {
    /// Provider by configured id, else the first one listed.
    pub fn select_provider<'a>(&self, providers: &'a [OidcProvider]) -> Result<&'a OidcProvider> {
        match &self.provider_id {
            Some(id) => providers
                .iter()
                .find(|p| &p.id == id)
                .ok_or_else(|| OpenEoError::auth(format!("unknown OIDC provider '{}'", id))),
            None => providers
                .first()
                .ok_or_else(|| OpenEoError::auth("backend lists no OIDC providers")),
        }
    }

    /// Configured client id, else the provider's first default client.
    pub fn select_client(&self, provider: &OidcProvider) -> Result<String> {
        if let Some(id) = &self.client_id {
            return Ok(id.clone());
        }
        provider
            .default_clients
            .first()
            .map(|c| c.id.clone())
            .ok_or_else(|| {
                OpenEoError::auth(format!(
                    "no client id configured and provider '{}' has no default client",
                    provider.id
                ))
            })
    }

    fn scopes(provider: &OidcProvider) -> String {
        let mut scopes = provider.scopes.clone();
        for required in ["openid", "offline_access"] {
            if !scopes.iter().any(|s| s == required) {
                scopes.push(required.to_string());
            }
        }
        scopes.join(" ")
    }

    async fn token_request(
        client: &Client,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> std::result::Result<TokenResponse, OAuthOutcome> {
        let response = client
            .post(endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| OAuthOutcome::Fatal(e.into()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OAuthOutcome::Fatal(e.into()))?;
        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| OAuthOutcome::Fatal(e.into()));
        }
        match serde_json::from_str::<OAuthError>(&text) {
            Ok(err) => Err(OAuthOutcome::Rejected(err)),
            Err(_) => Err(OAuthOutcome::Fatal(OpenEoError::auth(format!(
                "token endpoint returned {}: {}",
                status, text
            )))),
        }
    }

    async fn device_flow(
        &self,
        client: &Client,
        endpoints: &OidcEndpoints,
        client_id: &str,
        scope: &str,
    ) -> Result<TokenResponse> {
        let device_endpoint = endpoints
            .device_authorization_endpoint
            .as_deref()
            .ok_or_else(|| OpenEoError::auth("issuer does not support the device code flow"))?;
        let pkce = Pkce::generate();

        let response = client
            .post(device_endpoint)
            .form(&[
                ("client_id", client_id),
                ("scope", scope),
                ("code_challenge", pkce.challenge.as_str()),
                ("code_challenge_method", "S256"),
            ])
            .send()
            .await?;
        let device: DeviceAuthorization = check_response(response).await?.json().await?;
        (self.prompt)(&device);

        let mut interval = Duration::from_secs(device.interval.unwrap_or(DEFAULT_DEVICE_INTERVAL));
        let deadline = Instant::now() + Duration::from_secs(device.expires_in);
        loop {
            if Instant::now() >= deadline {
                return Err(OpenEoError::Timeout(
                    "device authorization expired before it was approved".into(),
                ));
            }
            tokio::time::sleep(interval).await;
            let form = [
                ("grant_type", DEVICE_CODE_GRANT),
                ("device_code", device.device_code.as_str()),
                ("client_id", client_id),
                ("code_verifier", pkce.verifier.as_str()),
            ];
            match Self::token_request(client, &endpoints.token_endpoint, &form).await {
                Ok(token) => return Ok(token),
                Err(OAuthOutcome::Rejected(e)) if e.error == "authorization_pending" => {
                    debug!("Device authorization pending");
                }
                Err(OAuthOutcome::Rejected(e)) if e.error == "slow_down" => {
                    interval += SLOW_DOWN_STEP;
                    debug!(interval_secs = interval.as_secs(), "Slowing down device polling");
                }
                Err(OAuthOutcome::Rejected(e)) => return Err(e.into_error()),
                Err(OAuthOutcome::Fatal(e)) => return Err(e),
            }
        }
    }
}

enum OAuthOutcome {
    /// The provider answered with an OAuth error document.
    Rejected(OAuthError),
    Fatal(OpenEoError),
}

impl OAuthError {
    fn into_error(self) -> OpenEoError {
        match self.error_description {
            Some(d) => OpenEoError::auth(format!("{}: {}", self.error, d)),
            None => OpenEoError::auth(self.error),
        }
    }
}

impl From<OAuthOutcome> for OpenEoError {
    fn from(outcome: OAuthOutcome) -> Self {
        match outcome {
            OAuthOutcome::Rejected(e) => e.into_error(),
            OAuthOutcome::Fatal(e) => e,
        }
    }
}

#[async_trait]
impl AuthMethod for OidcAuth {
    #[instrument(skip_all)]
    async fn authenticate(&self, conn: &Connection) -> Result<String> {
        let providers: ProviderList = conn.get_json("/credentials/oidc").await?;
        let provider = self.select_provider(&providers.providers)?;
        let client_id = self.select_client(provider)?;
        let scope = Self::scopes(provider);
        let client = conn.client();

        let config_url = format!(
            "{}/.well-known/openid-configuration",
            provider.issuer.trim_end_matches('/')
        );
        let endpoints: OidcEndpoints = check_response(client.get(&config_url).send().await?)
            .await?
            .json()
            .await?;
        debug!(provider = %provider.id, client_id = %client_id, "Using OIDC provider");

        let mut token = None;

        if let Some(store) = &self.store {
            if let Some(refresh) = store.get(&provider.issuer, &client_id)? {
                let mut form = vec![
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id.as_str()),
                    ("refresh_token", refresh.as_str()),
                ];
                if let Some(secret) = &self.client_secret {
                    form.push(("client_secret", secret.as_str()));
                }
                match Self::token_request(client, &endpoints.token_endpoint, &form).await {
                    Ok(t) => {
                        info!(provider = %provider.id, "Authenticated with stored refresh token");
                        token = Some(t);
                    }
                    Err(e) => {
                        let err: OpenEoError = e.into();
                        warn!(error = %err, "Stored refresh token rejected");
                    }
                }
            }
        }

        if token.is_none() {
            if let Some(secret) = &self.client_secret {
                let form = [
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", secret.as_str()),
                    ("scope", scope.as_str()),
                ];
                let t = Self::token_request(client, &endpoints.token_endpoint, &form).await?;
                info!(provider = %provider.id, "Authenticated with client credentials");
                token = Some(t);
            }
        }

        let token = match token {
            Some(t) => t,
            None if self.allow_device_flow => {
                let t = self.device_flow(client, &endpoints, &client_id, &scope).await?;
                info!(provider = %provider.id, "Authenticated with device code flow");
                t
            }
            None => {
                return Err(OpenEoError::auth(
                    "no stored refresh token and the device code flow is disabled",
                ))
            }
        };

        if let (Some(store), Some(refresh)) = (&self.store, &token.refresh_token) {
            store.set(&provider.issuer, &client_id, refresh)?;
        }
        Ok(format!("oidc/{}/{}", provider.id, token.access_token))
    }

    fn name(&self) -> &'static str {
        "oidc"
    }
}

/// Authenticate and check the token with `GET /me`.
///
/// On an authentication error the refresh-token store is cleared and the
/// method runs once more.
pub async fn authenticate_with_recovery(
    conn: &mut Connection,
    method: &dyn AuthMethod,
    store: Option<&RefreshTokenStore>,
) -> Result<()> {
    match authenticate_once(conn, method).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_auth_error() => {
            let Some(store) = store else {
                return Err(e);
            };
            warn!(method = method.name(), error = %e, "Authentication failed, clearing stored tokens and retrying");
            store.remove()?;
            authenticate_once(conn, method).await
        }
        Err(e) => Err(e),
    }
}

async fn authenticate_once(conn: &mut Connection, method: &dyn AuthMethod) -> Result<()> {
    conn.set_bearer(None);
    let bearer = method.authenticate(conn).await?;
    conn.set_bearer(Some(bearer));
    if let Err(e) = conn.describe_account().await {
        conn.set_bearer(None);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_rfc7636_example() {
        // Appendix B of RFC 7636.
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_generated_verifier_length() {
        let pkce = Pkce::generate();
        assert_eq!(pkce.verifier.len(), 43);
        assert_ne!(pkce.verifier, Pkce::generate().verifier);
    }

    fn provider(id: &str, clients: &[&str]) -> OidcProvider {
        OidcProvider {
            id: id.to_string(),
            issuer: format!("https://{}.example", id),
            title: None,
            scopes: vec!["openid".to_string()],
            default_clients: clients
                .iter()
                .map(|c| DefaultClient {
                    id: c.to_string(),
                    grant_types: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_provider_and_client_selection() {
        let providers = vec![provider("egi", &["egi-default"]), provider("cdse", &[])];
        let auth = OidcAuth::default();
        assert_eq!(auth.select_provider(&providers).unwrap().id, "egi");
        assert_eq!(auth.select_client(&providers[0]).unwrap(), "egi-default");
        assert!(auth.select_client(&providers[1]).is_err());

        let auth = OidcAuth {
            provider_id: Some("cdse".into()),
            client_id: Some("mine".into()),
            ..Default::default()
        };
        assert_eq!(auth.select_provider(&providers).unwrap().id, "cdse");
        assert_eq!(auth.select_client(&providers[1]).unwrap(), "mine");

        let auth = OidcAuth {
            provider_id: Some("nope".into()),
            ..Default::default()
        };
        assert!(auth.select_provider(&providers).is_err());
    }

    #[test]
    fn test_scopes_include_offline_access() {
        assert_eq!(OidcAuth::scopes(&provider("egi", &[])), "openid offline_access");
    }
}
