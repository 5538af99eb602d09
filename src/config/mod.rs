//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, env overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → lifecycle::startup builds registry, connectors, store, manager
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the chain registry is never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ConnectorConfig, ObservabilityConfig, SessionConfig, StorageConfig,
    TransportConfig,
};
