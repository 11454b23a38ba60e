use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::JsaError;

/// Portal credentials, read once at startup from a local JSON file.
/// Absence or malformation is fatal before any network call.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, JsaError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            JsaError::Config(format!("cannot read credential file {}: {e}", path.display()))
        })?;
        let creds: Credentials = serde_json::from_str(&raw).map_err(|e| {
            JsaError::Config(format!("malformed credential file {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), user = creds.user.as_str(), "Loaded credentials");
        Ok(creds)
    }
}

/// Environment-driven settings. Everything has a default; overrides come
/// from env vars so the binary runs unattended.
#[derive(Debug, Clone)]
pub struct Settings {
    pub portal_url: String,
    pub secrets_path: String,
    pub download_root: String,
    pub retry_max_attempts: u32,
    pub retry_delay: Duration,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            portal_url: env::var("JSA_PORTAL_URL")
                .unwrap_or_else(|_| "https://www.arcgis.com".to_string()),
            secrets_path: env::var("JSA_SECRETS_PATH")
                .unwrap_or_else(|_| "secrets.json".to_string()),
            download_root: env::var("JSA_DOWNLOAD_ROOT")
                .unwrap_or_else(|_| "downloads".to_string()),
            retry_max_attempts: env::var("JSA_RETRY_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("JSA_RETRY_ATTEMPTS must be a number"),
            retry_delay: Duration::from_secs(
                env::var("JSA_RETRY_DELAY_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("JSA_RETRY_DELAY_SECS must be a number"),
            ),
        }
    }
}
