//! Wallet connector subsystem.
//!
//! # Data Flow
//! ```text
//! SessionManager
//!     → set.rs (select by connector id)
//!     → Connector trait (request_accounts / restore / sign_request / switch_chain / teardown / release)
//!         → eip1193.rs   (injected wallet or remote signer, EIP-1193 requests)
//!         → local_key.rs (in-process private key)
//!     → events.rs (accountsChanged / chainChanged pushed back into the session queue)
//! ```
//!
//! # Design Decisions
//! - The session manager depends only on the `Connector` trait
//! - `teardown` is idempotent and safe before any connect
//! - `release` never revokes; it is used after transient failures and at shutdown
//! - User rejection is a distinct error, never folded into communication failures

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::{Chain, ChainId};
use crate::error::WalletError;
use crate::transport::Transport;

pub mod eip1193;
pub mod events;
pub mod http;
pub mod local_key;
pub mod set;

pub use eip1193::{Eip1193Connector, Eip1193Provider, ProviderRpcError};
pub use events::{WalletEvent, WalletEventSink};
pub use http::HttpEip1193Provider;
pub use local_key::LocalKeyConnector;
pub use set::ConnectorSet;

/// Wallet backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Browser-injected EIP-1193 wallet.
    Injected,
    /// Remote signer reached over JSON-RPC.
    RemoteSigner,
    /// In-process private key.
    LocalKey,
}

/// Errors returned by connector backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// The user declined the prompt.
    #[error("user rejected the request")]
    UserRejected,

    /// The wallet does not know the chain and could not add it.
    #[error("chain {0} is not available in the wallet")]
    ChainNotAdded(ChainId),

    /// The wallet answered without any account.
    #[error("wallet returned no accounts")]
    NoAccounts,

    /// The wallet or signer could not be reached or answered garbage.
    #[error("{0}")]
    Communication(String),

    /// The connector itself is misconfigured.
    #[error("invalid connector configuration: {0}")]
    Config(String),
}

impl From<ConnectorError> for WalletError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::UserRejected => WalletError::UserRejected(err.to_string()),
            other => WalletError::WalletCommunication(other.to_string()),
        }
    }
}

/// Accounts and chain reported by a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Authorized accounts, the active one first.
    pub accounts: Vec<Address>,
    /// Chain the wallet is currently on.
    pub chain_id: ChainId,
}

impl Connection {
    /// The active account.
    pub fn account(&self) -> Option<Address> {
        self.accounts.first().copied()
    }
}

/// Everything a connector needs to perform a handshake.
#[derive(Debug, Clone)]
pub struct HandshakeContext {
    /// Chain the session wants to be on.
    pub chain: Chain,
    /// Transport resolved for that chain.
    pub transport: Transport,
    /// Where unsolicited wallet events go.
    pub events: WalletEventSink,
}

/// Common capability set of every wallet backend.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable id used by `connect`.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    fn kind(&self) -> ConnectorKind;

    /// Prompt the user for account access and land on `ctx.chain` if possible.
    async fn request_accounts(&self, ctx: &HandshakeContext) -> Result<Connection, ConnectorError>;

    /// Check silently (no prompt) whether the wallet is still authorized.
    /// Returns `None` when it is not.
    async fn restore(&self, ctx: &HandshakeContext) -> Result<Option<Connection>, ConnectorError>;

    /// Sign a message with the given account.
    async fn sign_request(&self, account: Address, message: &[u8]) -> Result<Bytes, ConnectorError>;

    /// Ask the wallet to switch to `chain`.
    async fn switch_chain(&self, chain: &Chain) -> Result<(), ConnectorError>;

    /// End the wallet session, revoking access where the wallet supports it.
    /// Idempotent.
    async fn teardown(&self);

    /// Drop local state (event forwarding, handles) but leave the wallet's
    /// authorization in place, so a later silent restore can still succeed.
    /// Used when the session ends for reasons the user did not ask for.
    async fn release(&self) {}
}
