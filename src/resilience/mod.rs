//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Silent restore probe fails (timeout / communication error)
//!     → backoff.rs (exponential delay with jitter, from SessionConfig)
//!     → next attempt, up to session.reconnect_attempts
//! ```
//!
//! Every wallet and RPC call made by the session manager runs under a
//! `tokio::time::timeout`; see `SessionConfig`.

pub mod backoff;

pub use backoff::restore_delay;
