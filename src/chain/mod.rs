//! Chain registry subsystem.
//!
//! # Data Flow
//! ```text
//! AppConfig.chains (or builtins)
//!     → registry.rs (duplicate check, insertion order)
//!     → Arc<ChainRegistry> (immutable)
//!     → transport selector, connectors, session manager
//! ```

pub mod registry;
pub mod types;

pub use registry::ChainRegistry;
pub use types::{Chain, ChainId, NativeCurrency};
