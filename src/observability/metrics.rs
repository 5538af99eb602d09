//! Metrics collection.
//!
//! # Metrics
//! - `wallet_session_transitions_total` (counter): committed transitions by target status
//! - `wallet_transport_probes_total` (counter): endpoint probes by chain and outcome
//! - `wallet_transport_cache_invalidations_total` (counter): cached endpoints dropped
//! - `wallet_endpoint_health` (gauge): 1=healthy, 0=degraded
//!
//! Only the `metrics` facade is used; the embedding application installs a
//! recorder if it wants the numbers exported.

use metrics::{counter, gauge};

use crate::chain::ChainId;
use crate::session::SessionStatus;

pub fn record_transition(status: SessionStatus) {
    counter!("wallet_session_transitions_total", "status" => status.as_str()).increment(1);
}

pub fn record_probe(chain_id: ChainId, outcome: &'static str) {
    counter!(
        "wallet_transport_probes_total",
        "chain_id" => chain_id.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_endpoint_health(chain_id: ChainId, url: &str, healthy: bool) {
    gauge!(
        "wallet_endpoint_health",
        "chain_id" => chain_id.to_string(),
        "url" => url.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_cache_invalidation(chain_id: ChainId) {
    counter!(
        "wallet_transport_cache_invalidations_total",
        "chain_id" => chain_id.to_string()
    )
    .increment(1);
}
