//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Structured fields (chain_id, connector, status) on every event
//! - Private keys and signatures are never logged
//! - Metrics are cheap; no exporter is started by this crate

pub mod logging;
pub mod metrics;
