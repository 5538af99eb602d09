//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every section
//! has defaults so a minimal file (or none at all) yields the two-chain
//! mainnet/sepolia setup with a single injected connector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::chain::Chain;
use crate::connector::ConnectorKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name shown to wallets.
    pub app_name: String,

    /// Opaque network-access project key, passed through to remote signers.
    pub project_id: Option<String>,

    /// Supported chains; the first one is the default connect target.
    pub chains: Vec<Chain>,

    /// Wallet backends offered to the user.
    pub connectors: Vec<ConnectorConfig>,

    /// Transport selection settings.
    pub transport: TransportConfig,

    /// Session timeouts and reconnect policy.
    pub session: SessionConfig,

    /// Where the session record is persisted.
    pub storage: StorageConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Piggybank".to_string(),
            project_id: None,
            chains: vec![Chain::mainnet(), Chain::sepolia()],
            connectors: vec![ConnectorConfig::injected()],
            transport: TransportConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A wallet backend entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectorConfig {
    /// Connector id used by `connect`.
    pub id: String,

    /// Display name (defaults to the id).
    #[serde(default)]
    pub name: Option<String>,

    /// Backend type.
    pub kind: ConnectorKind,

    /// Remote signer JSON-RPC URL (`remote_signer` only).
    #[serde(default)]
    pub url: Option<Url>,

    /// Environment variable holding the private key (`local_key` only).
    #[serde(default)]
    pub private_key_env: Option<String>,
}

impl ConnectorConfig {
    /// The browser-injected wallet entry.
    pub fn injected() -> Self {
        Self {
            id: "injected".to_string(),
            name: Some("Browser Wallet".to_string()),
            kind: ConnectorKind::Injected,
            url: None,
            private_key_env: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Transport selection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-endpoint probe timeout in milliseconds.
    pub probe_timeout_ms: u64,

    /// Consecutive failures on the cached endpoint before re-probing from the top.
    pub failure_threshold: u32,

    /// Request timeout for transports handed to callers, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5_000,
            failure_threshold: 2,
            request_timeout_secs: 10,
        }
    }
}

impl TransportConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session timeouts and reconnect policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Abandon `Connecting` after this many seconds.
    pub connect_timeout_secs: u64,

    /// Timeout for each silent restore probe, in seconds.
    pub reconnect_timeout_secs: u64,

    /// Restore probes attempted before giving up.
    pub reconnect_attempts: u32,

    /// Base delay for exponential backoff between restore probes.
    pub reconnect_base_delay_ms: u64,

    /// Maximum backoff delay between restore probes.
    pub reconnect_max_delay_ms: u64,

    /// Timeout for switch-chain and signing requests, in seconds.
    pub request_timeout_secs: u64,

    /// Capacity of the change-event broadcast channel.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 120,
            reconnect_timeout_secs: 10,
            reconnect_attempts: 3,
            reconnect_base_delay_ms: 250,
            reconnect_max_delay_ms: 2_000,
            request_timeout_secs: 60,
            event_buffer: 64,
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn reconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.reconnect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session persistence settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the session record. `None` keeps it in memory.
    pub path: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the pretty format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
