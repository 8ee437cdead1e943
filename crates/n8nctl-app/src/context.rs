//! Shared command context: effective settings plus lazily-created handles
//! to the knowledge base, version store, and remote client.

use std::path::PathBuf;
use std::sync::Arc;

use n8nctl_api::{ApiClient, ApiConfig, GuardMode, SsrfGuard};
use n8nctl_core::{EngineError, ErrorClass};
use n8nctl_kb::{NodeCatalog, SqliteCatalog};
use n8nctl_store::{StoreOptions, VersionStore};

use crate::config::Settings;

/// Everything a command handler needs.
pub struct AppContext {
    pub settings: Settings,
    /// The knowledge base is opened once per process and shared.
    catalog: std::sync::OnceLock<Arc<dyn NodeCatalog>>,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            catalog: std::sync::OnceLock::new(),
        }
    }

    /// The process-wide catalog handle, opening the bundled database on
    /// first use.
    pub fn catalog(&self) -> Result<Arc<dyn NodeCatalog>, EngineError> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog.clone());
        }
        let opened = self.open_catalog()?;
        Ok(self.catalog.get_or_init(|| opened).clone())
    }

    /// Locate and open the bundled node database. Search order: explicit
    /// config, `N8N_NODES_DB`, next to the executable, then the data dir.
    fn open_catalog(&self) -> Result<Arc<dyn NodeCatalog>, EngineError> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(explicit) = &self.settings.nodes_db {
            candidates.push(explicit.clone());
        }
        if let Ok(env_path) = std::env::var("N8N_NODES_DB") {
            candidates.push(PathBuf::from(env_path));
        }
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("nodes.db"));
            }
        }
        candidates.push(self.settings.data_dir.join("nodes.db"));

        for candidate in &candidates {
            if candidate.exists() {
                let catalog = SqliteCatalog::open(candidate)?;
                return Ok(Arc::new(catalog));
            }
        }
        Err(EngineError::Config {
            message: format!(
                "node database not found; looked in {}",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
    }

    /// Open the local version store under the data directory.
    pub fn store(&self) -> Result<VersionStore, n8nctl_store::StoreError> {
        VersionStore::open(
            &self.settings.data_dir,
            &StoreOptions {
                strict_permissions: self.settings.strict_permissions,
            },
        )
    }

    /// Directory for raw pre-mutation workflow backups.
    pub fn backups_dir(&self) -> PathBuf {
        self.settings.data_dir.join("backups")
    }

    /// Build the remote client; requires host and API key to be configured.
    pub fn api(&self) -> Result<ApiClient, (ErrorClass, &'static str, String)> {
        let host = self.settings.host.clone().ok_or((
            ErrorClass::Config,
            "CONFIG_INVALID",
            "no instance host configured; set --host or N8N_HOST".to_string(),
        ))?;
        let api_key = self.settings.api_key.clone().ok_or((
            ErrorClass::Config,
            "CONFIG_INVALID",
            "no API key configured; set N8N_API_KEY".to_string(),
        ))?;
        let config = ApiConfig::new(host, api_key).with_timeout(self.settings.timeout);
        ApiClient::new(config).map_err(|e| {
            (
                ErrorClass::Unavailable,
                "HOST_UNREACHABLE",
                e.to_string(),
            )
        })
    }

    /// SSRF guard with the configured mode.
    pub fn ssrf_guard(&self, override_mode: Option<&str>) -> Result<SsrfGuard, EngineError> {
        let raw = override_mode.unwrap_or(&self.settings.ssrf_guard);
        let mode = GuardMode::parse(raw).ok_or_else(|| EngineError::Config {
            message: format!("invalid SSRF guard mode '{raw}' (strict, moderate, off)"),
        })?;
        Ok(SsrfGuard::new(mode))
    }
}
