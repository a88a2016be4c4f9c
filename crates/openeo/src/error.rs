//! Error types for the openEO client.

use thiserror::Error;

/// openEO error codes that mean the credentials must be renewed.
const AUTH_ERROR_CODES: &[&str] = &[
    "AuthenticationRequired",
    "AuthenticationSchemeInvalid",
    "TokenInvalid",
    "CredentialsInvalid",
];

#[derive(Error, Debug)]
pub enum OpenEoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error document returned by the backend (`{id, code, message}`).
    #[error("openEO API error {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        id: Option<String>,
    },

    /// OIDC provider error or an unusable authentication setup.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A batch job ended in `error` or `canceled`.
    #[error("job {job_id} ended with status '{status}': {}", messages.join("; "))]
    JobFailed {
        job_id: String,
        status: String,
        messages: Vec<String>,
    },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl OpenEoError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// True when new credentials could fix the failure.
    pub fn is_auth_error(&self) -> bool {
        match self {
            OpenEoError::Api { status, code, .. } => {
                *status == 401 || AUTH_ERROR_CODES.contains(&code.as_str())
            }
            OpenEoError::Auth(_) => true,
            OpenEoError::Http(e) => e.status().map(|s| s.as_u16() == 401).unwrap_or(false),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenEoError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> OpenEoError {
        OpenEoError::Api {
            status,
            code: code.to_string(),
            message: "x".to_string(),
            id: None,
        }
    }

    #[test]
    fn test_auth_error_classification() {
        assert!(api(403, "TokenInvalid").is_auth_error());
        assert!(api(401, "Whatever").is_auth_error());
        assert!(api(403, "CredentialsInvalid").is_auth_error());
        assert!(!api(400, "ProcessGraphInvalid").is_auth_error());
        assert!(!OpenEoError::Timeout("job".into()).is_auth_error());
    }

    #[test]
    fn test_job_failed_message() {
        let err = OpenEoError::JobFailed {
            job_id: "j-1".into(),
            status: "error".into(),
            messages: vec!["out of memory".into(), "retry".into()],
        };
        assert_eq!(
            err.to_string(),
            "job j-1 ended with status 'error': out of memory; retry"
        );
    }
}
