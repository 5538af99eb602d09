//! The configured set of wallet backends.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConnectorConfig;
use crate::connector::{
    Connector, ConnectorError, ConnectorKind, Eip1193Connector, Eip1193Provider, LocalKeyConnector,
};
use crate::error::{WalletError, WalletResult};

/// Connectors keyed by id, fixed after startup.
#[derive(Default)]
pub struct ConnectorSet {
    connectors: Vec<Arc<dyn Connector>>,
    index: HashMap<String, usize>,
}

impl ConnectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connector.
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> WalletResult<()> {
        let id = connector.id().to_string();
        if self.index.contains_key(&id) {
            return Err(WalletError::DuplicateConnector(id));
        }
        tracing::debug!(connector = %id, kind = ?connector.kind(), "Connector registered");
        self.index.insert(id, self.connectors.len());
        self.connectors.push(connector);
        Ok(())
    }

    /// Build the set from configuration.
    ///
    /// `injected` is the host-supplied provider for browser wallets; injected
    /// entries are skipped when the host has none.
    pub fn from_config(
        configs: &[ConnectorConfig],
        project_id: Option<&str>,
        injected: Option<Arc<dyn Eip1193Provider>>,
    ) -> Result<Self, ConnectorError> {
        let mut set = Self::new();

        for config in configs {
            let connector: Arc<dyn Connector> = match config.kind {
                ConnectorKind::Injected => match &injected {
                    Some(provider) => Arc::new(Eip1193Connector::injected(
                        config.id.clone(),
                        config.display_name(),
                        provider.clone(),
                    )),
                    None => {
                        tracing::warn!(connector = %config.id, "No injected wallet available, skipping connector");
                        continue;
                    }
                },
                ConnectorKind::RemoteSigner => {
                    let url = config.url.clone().ok_or_else(|| {
                        ConnectorError::Config(format!("remote signer '{}' has no url", config.id))
                    })?;
                    Arc::new(Eip1193Connector::remote_signer(
                        config.id.clone(),
                        config.display_name(),
                        url,
                        project_id.map(str::to_string),
                    ))
                }
                ConnectorKind::LocalKey => Arc::new(LocalKeyConnector::from_env(
                    config.id.clone(),
                    config.private_key_env.as_deref(),
                )?),
            };

            set.register(connector)
                .map_err(|e| ConnectorError::Config(e.to_string()))?;
        }

        tracing::info!(connectors = ?set.ids(), "Connector set ready");
        Ok(set)
    }

    /// Builder-style `register`.
    pub fn with(mut self, connector: Arc<dyn Connector>) -> WalletResult<Self> {
        self.register(connector)?;
        Ok(self)
    }

    /// Look up a connector by id.
    pub fn get(&self, id: &str) -> WalletResult<Arc<dyn Connector>> {
        self.index
            .get(id)
            .map(|&i| self.connectors[i].clone())
            .ok_or_else(|| WalletError::UnknownConnector(id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl std::fmt::Debug for ConnectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorSet").field("connectors", &self.ids()).finish()
    }
}
