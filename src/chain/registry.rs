//! Read-only catalog of supported chains.
//!
//! Built once at startup and shared as `Arc<ChainRegistry>`. Insertion order is
//! kept because the first registered chain is the default connect target.

use std::collections::HashMap;

use crate::chain::types::{Chain, ChainId};
use crate::error::{WalletError, WalletResult};

/// Registry of chains keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
    index: HashMap<ChainId, usize>,
}

impl ChainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of chains, failing on the first duplicate id.
    pub fn from_chains<I>(chains: I) -> WalletResult<Self>
    where
        I: IntoIterator<Item = Chain>,
    {
        let mut registry = Self::new();
        for chain in chains {
            registry.register(chain)?;
        }
        Ok(registry)
    }

    /// Register a chain.
    pub fn register(&mut self, chain: Chain) -> WalletResult<()> {
        if self.index.contains_key(&chain.id) {
            return Err(WalletError::DuplicateChain(chain.id));
        }
        tracing::debug!(chain_id = %chain.id, name = %chain.name, "Chain registered");
        self.index.insert(chain.id, self.chains.len());
        self.chains.push(chain);
        Ok(())
    }

    /// Look up a chain by id.
    pub fn get(&self, id: ChainId) -> WalletResult<&Chain> {
        self.index
            .get(&id)
            .map(|&i| &self.chains[i])
            .ok_or(WalletError::UnknownChain(id))
    }

    pub fn contains(&self, id: ChainId) -> bool {
        self.index.contains_key(&id)
    }

    /// The chain used when `connect` is called without a preference.
    pub fn default_chain(&self) -> Option<&Chain> {
        self.chains.first()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<ChainId> {
        self.chains.iter().map(|c| c.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
