//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the chain registry, transport selector and connector set
//! - Open the session store and start the session manager
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Host glue (injected wallet, custom probe or store) comes in through `StartupOptions`

use std::sync::Arc;
use thiserror::Error;

use crate::chain::ChainRegistry;
use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError, StorageConfig};
use crate::connector::{ConnectorError, ConnectorSet, Eip1193Provider};
use crate::error::WalletError;
use crate::session::SessionManager;
use crate::storage::{FileSessionStore, MemorySessionStore, SessionStore};
use crate::transport::{EndpointProbe, RpcProbe, TransportSelector};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("chain registry error: {0}")]
    Registry(#[from] WalletError),

    #[error("connector setup failed: {0}")]
    Connector(#[from] ConnectorError),
}

/// Host-provided pieces that cannot come from a config file.
#[derive(Default)]
pub struct StartupOptions {
    /// The browser wallet, when the host has one.
    pub injected_provider: Option<Arc<dyn Eip1193Provider>>,
    /// Endpoint probe; defaults to `eth_chainId` over HTTP.
    pub probe: Option<Arc<dyn EndpointProbe>>,
    /// Session store; defaults to what `config.storage` names.
    pub store: Option<Arc<dyn SessionStore>>,
}

/// Wire every subsystem from `config` and start the session manager.
///
/// Must be called from within a tokio runtime.
pub fn start(config: &AppConfig, options: StartupOptions) -> Result<SessionManager, StartupError> {
    validate_config(config).map_err(ConfigError::Validation)?;

    let registry = Arc::new(ChainRegistry::from_chains(config.chains.iter().cloned())?);
    tracing::info!(chains = ?registry.ids(), "Chain registry built");

    let probe = options.probe.unwrap_or_else(|| Arc::new(RpcProbe));
    let selector = Arc::new(TransportSelector::new(registry, probe, config.transport.clone()));

    let connectors = ConnectorSet::from_config(
        &config.connectors,
        config.project_id.as_deref(),
        options.injected_provider,
    )?;

    let store = options.store.unwrap_or_else(|| open_store(&config.storage));

    tracing::info!(app = %config.app_name, "Starting session manager");
    Ok(SessionManager::start(selector, connectors, store, config.session.clone()))
}

/// The store named by the storage section.
pub fn open_store(config: &StorageConfig) -> Arc<dyn SessionStore> {
    match &config.path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Using file session store");
            Arc::new(FileSessionStore::new(path.clone()))
        }
        None => {
            tracing::debug!("Using in-memory session store");
            Arc::new(MemorySessionStore::new())
        }
    }
}
