//! Wallet connectivity and multi-chain transport manager.
//!
//! # Architecture Overview
//!
//! ```text
//!   UI / presentation layer
//!        │  SessionHandle (connect, disconnect, switch_chain, sign_message,
//!        │                 snapshot, watch, subscribe, on_change, transport)
//!        ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ session      actor owning the single Session, persistence,   │
//!   │              startup restore, change events                  │
//!   │    │                          │                               │
//!   │    ▼                          ▼                               │
//!   │ connector    ConnectorSet   transport   TransportSelector     │
//!   │ (injected, remote signer,   (probe, failover, cache)          │
//!   │  local key)                   │                               │
//!   │                               ▼                               │
//!   │                       chain  ChainRegistry                    │
//!   │                                                               │
//!   │ config · observability · resilience · storage · lifecycle     │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod chain;
pub mod connector;
pub mod session;
pub mod transport;

// Supporting subsystems
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod storage;

pub use chain::{Chain, ChainId, ChainRegistry};
pub use config::AppConfig;
pub use connector::{Connector, ConnectorKind, ConnectorSet};
pub use error::{WalletError, WalletResult};
pub use lifecycle::{Shutdown, ShutdownSignal, StartupOptions};
pub use session::{Session, SessionHandle, SessionManager, SessionStatus};
pub use storage::{PersistedSession, SessionStore};
pub use transport::{Transport, TransportSelector};
