//! Runtime configuration from the environment (and `.env`, loaded by `main`).
//!
//! API origin: MAILER_API_URL > VITE_API_URL > localhost default.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::api::auth::StoreKind;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Every backend route lives under this prefix.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Fixed ceiling for a single request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {var}={value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where and how the API client talks to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Scheme + host (+ port), e.g. `http://localhost:8080`.
    pub origin: String,
    /// Path prefix shared by all API routes, e.g. `/api/v1`.
    pub prefix: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Origin joined with the prefix, without a trailing slash.
    pub fn base_url(&self) -> String {
        let origin = self.origin.trim_end_matches('/');
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            origin.to_string()
        } else {
            format!("{}/{}", origin, prefix)
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub store: StoreKind,
    /// Overrides the file store location.
    pub storage_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = lookup("MAILER_API_URL")
            .or_else(|| lookup("VITE_API_URL"))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let mut api = ApiConfig::new(&origin);

        if let Some(prefix) = lookup("MAILER_API_PREFIX") {
            api.prefix = prefix;
        }

        if let Some(raw) = lookup("MAILER_API_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "MAILER_API_TIMEOUT_SECS",
                value: raw.clone(),
                reason: format!("{}", e),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: "MAILER_API_TIMEOUT_SECS",
                    value: raw,
                    reason: "must be at least 1".to_string(),
                });
            }
            api.timeout = Duration::from_secs(secs);
        }

        let store = match lookup("MAILER_CREDENTIAL_STORE") {
            Some(raw) => raw.parse::<StoreKind>().map_err(|reason| ConfigError::Invalid {
                var: "MAILER_CREDENTIAL_STORE",
                value: raw.clone(),
                reason,
            })?,
            None => StoreKind::File,
        };

        let storage_path = lookup("MAILER_STORAGE_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api,
            store,
            storage_path,
        })
    }
}
