//! Refresh tokens persisted between runs.
//!
//! The file holds `{issuer: {client_id: {date, refresh_token}}}` and is only
//! readable by its owner.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    /// When the token was stored (RFC 3339).
    pub date: String,
    pub refresh_token: String,
}

type TokenMap = BTreeMap<String, BTreeMap<String, StoredToken>>;

#[derive(Debug, Clone)]
pub struct RefreshTokenStore {
    path: PathBuf,
}

impl RefreshTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HOME/.local/share/bioma/refresh-tokens.json`, or the working
    /// directory when `HOME` is not set.
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home)
                .join(".local")
                .join("share")
                .join("bioma")
                .join("refresh-tokens.json"),
            None => PathBuf::from("refresh-tokens.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<TokenMap> {
        if !self.path.exists() {
            return Ok(TokenMap::new());
        }
        let text = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&text) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt token store");
                Ok(TokenMap::new())
            }
        }
    }

    fn save(&self, map: &TokenMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(&serde_json::to_vec_pretty(map)?)?;
        Ok(())
    }

    pub fn get(&self, issuer: &str, client_id: &str) -> Result<Option<String>> {
        let map = self.load()?;
        Ok(map
            .get(issuer)
            .and_then(|clients| clients.get(client_id))
            .map(|t| t.refresh_token.clone()))
    }

    pub fn set(&self, issuer: &str, client_id: &str, refresh_token: &str) -> Result<()> {
        let mut map = self.load()?;
        map.entry(issuer.to_string()).or_default().insert(
            client_id.to_string(),
            StoredToken {
                date: Utc::now().to_rfc3339(),
                refresh_token: refresh_token.to_string(),
            },
        );
        self.save(&map)?;
        debug!(issuer, client_id, "Stored refresh token");
        Ok(())
    }

    /// Delete the whole store.
    pub fn remove(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "Removed refresh token store");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = RefreshTokenStore::new(dir.path().join("nested").join("tokens.json"));

        assert_eq!(store.get("https://issuer", "client").unwrap(), None);
        store.set("https://issuer", "client", "r1").unwrap();
        store.set("https://issuer", "other", "r2").unwrap();
        assert_eq!(store.get("https://issuer", "client").unwrap().as_deref(), Some("r1"));
        assert_eq!(store.get("https://issuer", "other").unwrap().as_deref(), Some("r2"));

        store.remove().unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get("https://issuer", "client").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = RefreshTokenStore::new(dir.path().join("tokens.json"));
        store.set("i", "c", "r").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_wide_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let store = RefreshTokenStore::new(&path);
        store.set("i", "c", "r").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.get("i", "c").unwrap().as_deref(), Some("r"));
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json").unwrap();
        let store = RefreshTokenStore::new(&path);
        assert_eq!(store.get("i", "c").unwrap(), None);
    }
}
