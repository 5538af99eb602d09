//! Transport selection subsystem.
//!
//! # Data Flow
//! ```text
//! resolve(chain_id)
//!     → ChainRegistry (ordered rpc_urls)
//!     → probe.rs (eth_chainId per endpoint, with timeout)
//!     → endpoint.rs (healthy/degraded bookkeeping)
//!     → selector.rs (cache last healthy endpoint per chain)
//!     → Transport
//! ```
//!
//! # Design Decisions
//! - Steady state costs one map lookup; probing only on cold or invalidated cache
//! - An endpoint reporting another chain id counts as degraded

pub mod endpoint;
pub mod probe;
pub mod selector;

pub use endpoint::{EndpointHealth, EndpointState};
pub use probe::{EndpointProbe, ProbeError, RpcProbe};
pub use selector::{Transport, TransportSelector};
