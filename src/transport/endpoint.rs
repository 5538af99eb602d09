//! Per-endpoint health tracking.
//!
//! # Responsibilities
//! - Represent a single RPC endpoint of a chain
//! - Track health state (Unknown/Healthy/Degraded)
//! - Count consecutive failures for cache invalidation

use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use url::Url;

/// Endpoint health state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointState {
    Unknown = 0,
    Healthy = 1,
    Degraded = 2,
}

impl From<u8> for EndpointState {
    fn from(val: u8) -> Self {
        match val {
            1 => EndpointState::Healthy,
            2 => EndpointState::Degraded,
            _ => EndpointState::Unknown,
        }
    }
}

/// A single RPC endpoint.
#[derive(Debug)]
pub struct Endpoint {
    /// Endpoint URL.
    pub url: Url,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
}

impl Endpoint {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            state: AtomicU8::new(EndpointState::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> EndpointState {
        EndpointState::from(self.state.load(Ordering::Relaxed))
    }

    /// Record a successful probe or request.
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.state.store(EndpointState::Healthy as u8, Ordering::Relaxed);
    }

    /// Record a failed probe or request. Returns the consecutive failure count.
    pub fn mark_failure(&self) -> u32 {
        self.state.store(EndpointState::Degraded as u8, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Point-in-time view for diagnostics.
    pub fn health(&self) -> EndpointHealth {
        EndpointHealth {
            url: self.url.to_string(),
            state: self.state(),
            consecutive_failures: self.consecutive_failures(),
        }
    }
}

/// Serializable snapshot of an endpoint's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHealth {
    pub url: String,
    pub state: EndpointState,
    pub consecutive_failures: u32,
}
