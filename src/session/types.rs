//! Session state exposed to the presentation layer.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::ChainId;
use crate::storage::PersistedSession;

/// Connection lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Reconnecting => "reconnecting",
            SessionStatus::Error => "error",
        }
    }

    /// A connect or restore is running.
    pub fn is_transitioning(self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::Reconnecting)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current wallet connection.
///
/// `Connected` always carries an account and a registered chain id.
/// `Disconnected` carries nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connector_id: Option<String>,
    pub chain_id: Option<ChainId>,
    pub account: Option<Address>,
    pub status: SessionStatus,
    /// Message of the failure that put the session into `Error`.
    pub last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::disconnected()
    }
}

impl Session {
    pub fn disconnected() -> Self {
        Self {
            connector_id: None,
            chain_id: None,
            account: None,
            status: SessionStatus::Disconnected,
            last_error: None,
        }
    }

    pub(crate) fn connecting(connector_id: &str, chain_id: ChainId) -> Self {
        Self {
            connector_id: Some(connector_id.to_string()),
            chain_id: Some(chain_id),
            account: None,
            status: SessionStatus::Connecting,
            last_error: None,
        }
    }

    pub(crate) fn connected(connector_id: String, chain_id: ChainId, account: Address) -> Self {
        Self {
            connector_id: Some(connector_id),
            chain_id: Some(chain_id),
            account: Some(account),
            status: SessionStatus::Connected,
            last_error: None,
        }
    }

    pub(crate) fn reconnecting(record: &PersistedSession) -> Self {
        Self {
            connector_id: Some(record.connector_id.clone()),
            chain_id: Some(record.chain_id),
            account: Some(record.account),
            status: SessionStatus::Reconnecting,
            last_error: None,
        }
    }

    pub(crate) fn failed(connector_id: Option<String>, chain_id: Option<ChainId>, error: String) -> Self {
        Self {
            connector_id,
            chain_id,
            account: None,
            status: SessionStatus::Error,
            last_error: Some(error),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    /// The record to persist, present only for a connected session.
    pub fn persisted(&self) -> Option<PersistedSession> {
        if !self.is_connected() {
            return None;
        }
        Some(PersistedSession {
            connector_id: self.connector_id.clone()?,
            chain_id: self.chain_id?,
            account: self.account?,
        })
    }
}
