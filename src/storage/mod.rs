//! Session persistence.
//!
//! A single record `{connector_id, chain_id, account}` is written whenever the
//! session commits to `Connected` (or is updated in place) and removed when it
//! commits to `Disconnected`. It is read exactly once, at manager startup.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::error::WalletResult;

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// The durable part of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub connector_id: String,
    pub chain_id: ChainId,
    pub account: Address,
}

/// Key-value storage for the single session record.
pub trait SessionStore: Send + Sync {
    /// Read the record, `None` if nothing was persisted.
    fn load(&self) -> WalletResult<Option<PersistedSession>>;

    /// Overwrite the record.
    fn save(&self, record: &PersistedSession) -> WalletResult<()>;

    /// Remove the record. Succeeds if nothing is stored.
    fn clear(&self) -> WalletResult<()>;
}
