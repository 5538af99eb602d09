//! Session management subsystem.
//!
//! # Data Flow
//! ```text
//! SessionHandle (connect / disconnect / switch_chain / sign_message)
//!     → command queue (unbounded mpsc, arrival order)
//!         ← WalletEventSink (accountsChanged / chainChanged / disconnect)
//!         ← spawned handshake / restore / switch / sign tasks (completion messages)
//!     → actor.rs (single owner of Session)
//!         → SessionStore (persist on Connected, clear on Disconnected)
//!         → watch (snapshot) + broadcast (one event per transition)
//! ```
//!
//! # Design Decisions
//! - One task owns the session; no locks around state
//! - Spawned work is tagged with an epoch; stale results are dropped
//! - At most one switch or sign request waits on the wallet at a time
//! - Runtime failures become `Error` state, never panics or thrown errors

mod actor;
pub(crate) mod command;
pub mod handle;
pub mod manager;
pub mod types;

pub use handle::SessionHandle;
pub use manager::SessionManager;
pub use types::{Session, SessionStatus};
