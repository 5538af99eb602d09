//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → ChainRegistry → TransportSelector → ConnectorSet
//!     → SessionStore → SessionManager (restore runs once)
//!
//! Shutdown (shutdown.rs):
//!     SessionManager::shutdown → sticky watch flag → actor aborts in-flight work → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then chains, then connectors, then the actor
//! - Fail fast: any startup error is fatal, runtime errors become session state
//! - Shutdown keeps the persisted session for the next start

pub mod shutdown;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{open_store, start, StartupError, StartupOptions};
