//! Remote store configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

pub const ENV_REMOTE_URL: &str = "COURIER_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "COURIER_REMOTE_KEY";
pub const ENV_REQUEST_TIMEOUT: &str = "COURIER_REQUEST_TIMEOUT_SECS";

/// Configuration for the remote row/blob store client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RemoteConfig {
    /// Base URL of the backend (e.g., "https://project.example.co").
    pub base_url: String,

    /// Public API key sent as `apikey` on every request.
    pub api_key: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl RemoteConfig {
    /// Reads the configuration from `COURIER_REMOTE_URL`, `COURIER_REMOTE_KEY`
    /// and the optional `COURIER_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RemoteConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SyncError::Config(format!("{key} is not set")))
        };

        let base_url = required(ENV_REMOTE_URL)?;
        let api_key = required(ENV_REMOTE_KEY)?;
        let request_timeout_secs = match lookup(ENV_REQUEST_TIMEOUT) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                SyncError::Config(format!(
                    "{ENV_REQUEST_TIMEOUT} must be a whole number of seconds, got {raw:?}"
                ))
            })?,
            None => Self::default().request_timeout_secs,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout_secs,
        })
    }
}
