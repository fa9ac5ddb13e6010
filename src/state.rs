//! Application state for the console shell.
//!
//! Wires the route table, the shared API client and the credential store
//! together once at startup. Commands borrow it; nothing in here is mutated
//! after construction except through the store's own locking.

use std::sync::Arc;

use crate::api::auth::{open_store, CredentialStore};
use crate::api::client::ApiClient;
use crate::config::AppConfig;
use crate::nav::{dashboard_router, Router, ScreenCatalog, StaticCatalog};
use crate::notify::Notifier;

pub struct AppState {
    /// HTTP client shared by every command.
    pub api: Arc<ApiClient>,

    /// Dashboard route table. Screens are cached per route for the life of
    /// the process.
    pub router: Router,

    /// Session credential read by `api` and written by login/logout.
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    /// Open the configured credential store and build the client and router.
    pub fn new(config: &AppConfig, notifier: Arc<dyn Notifier>) -> Result<Self, String> {
        let credentials = open_store(config.store, config.storage_path.as_deref())
            .map_err(|e| format!("Failed to open credential store: {}", e))?;
        Self::from_parts(config, credentials, notifier, Arc::new(StaticCatalog))
    }

    /// Build from an already-open store and a screen catalog.
    pub fn from_parts(
        config: &AppConfig,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        catalog: Arc<dyn ScreenCatalog>,
    ) -> Result<Self, String> {
        let api = ApiClient::new(&config.api, Arc::clone(&credentials), notifier)
            .map_err(|e| format!("Failed to build API client: {}", e))?;
        let router =
            dashboard_router(catalog).map_err(|e| format!("Invalid route table: {}", e))?;

        log::info!(
            "Console ready: api={} store={:?}",
            api.base_url(),
            config.store
        );

        Ok(Self {
            api: Arc::new(api),
            router,
            credentials,
        })
    }

    pub fn is_signed_in(&self) -> bool {
        self.credentials
            .read()
            .map(|token| !token.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{MemoryStore, StoreKind};
    use crate::config::ApiConfig;
    use crate::notify::LogNotifier;

    fn memory_config() -> AppConfig {
        AppConfig {
            api: ApiConfig::new("http://127.0.0.1:9"),
            store: StoreKind::Memory,
            storage_path: None,
        }
    }

    #[test]
    fn test_new_with_memory_store() {
        let state = AppState::new(&memory_config(), Arc::new(LogNotifier)).unwrap();
        assert_eq!(state.api.base_url(), "http://127.0.0.1:9/api/v1");
        assert_eq!(state.router.default_path().unwrap(), "/dashboard");
        assert!(!state.is_signed_in());
    }

    #[test]
    fn test_client_shares_store() {
        let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::with_token("abc123"));
        let state = AppState::from_parts(
            &memory_config(),
            Arc::clone(&store),
            Arc::new(LogNotifier),
            Arc::new(StaticCatalog),
        )
        .unwrap();
        assert!(state.is_signed_in());

        store.clear().unwrap();
        assert!(!state.is_signed_in());
    }

    #[test]
    fn test_file_store_opened_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let config = AppConfig {
            store: StoreKind::File,
            storage_path: Some(path.clone()),
            ..memory_config()
        };

        let state = AppState::new(&config, Arc::new(LogNotifier)).unwrap();
        state.credentials.store("tok").unwrap();
        assert!(path.exists());
        assert!(state.is_signed_in());
    }
}
