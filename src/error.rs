//! Crate-wide error taxonomy.
//!
//! # Propagation
//! - Registry and configuration errors surface at startup and are fatal
//! - Runtime connection errors are folded into `Session::last_error` and
//!   published to subscribers; callers of `connect` only see the errors that
//!   reject a request before any transition happens

use thiserror::Error;

use crate::chain::ChainId;
use crate::session::SessionStatus;

/// Errors produced by the registry, transport selector, connectors and session manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// A chain with this id is already registered.
    #[error("chain {0} is already registered")]
    DuplicateChain(ChainId),

    /// The chain id is not in the registry.
    #[error("chain {0} is not registered")]
    UnknownChain(ChainId),

    /// The registry is empty, so there is no default chain.
    #[error("no chains are registered")]
    NoChains,

    /// No connector with this id is configured.
    #[error("unknown connector '{0}'")]
    UnknownConnector(String),

    /// A connector with this id is already configured.
    #[error("connector '{0}' is already registered")]
    DuplicateConnector(String),

    /// Every RPC endpoint for the chain failed its probe.
    #[error("no healthy RPC endpoint for chain {0}")]
    NoHealthyEndpoint(ChainId),

    /// A connect or restore is already running.
    #[error("a session transition is already in progress ({0})")]
    TransitionInProgress(SessionStatus),

    /// The user declined the request in their wallet.
    #[error("user rejected the request: {0}")]
    UserRejected(String),

    /// The wallet or its transport failed to answer.
    #[error("wallet communication failed: {0}")]
    WalletCommunication(String),

    /// The operation is not valid from the current session status.
    #[error("cannot {op} while session is {status}")]
    InvalidState {
        op: &'static str,
        status: SessionStatus,
    },

    /// Reading or writing the persisted session failed.
    #[error("session storage error: {0}")]
    Storage(String),

    /// A switch-chain or signing request is already waiting on the wallet.
    #[error("another wallet request is still pending")]
    RequestPending,

    /// The request was abandoned because the session ended first.
    #[error("wallet request cancelled: session ended")]
    Cancelled,

    /// The session manager task has shut down.
    #[error("session manager is not running")]
    ManagerStopped,
}

impl WalletError {
    /// Whether a fresh `connect` call may succeed after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::WalletCommunication(_) | WalletError::NoHealthyEndpoint(_)
        )
    }
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
