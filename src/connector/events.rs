//! Unsolicited wallet events.
//!
//! Connectors push events through a [`WalletEventSink`]. The sink feeds the same
//! queue as user commands, so events and calls are applied in arrival order.
//! Each sink is stamped with the epoch of the connect/restore attempt that
//! created it; events from an older attempt are dropped by the manager.

use alloy::primitives::Address;
use tokio::sync::mpsc;

use crate::chain::ChainId;
use crate::session::command::Command;

/// Event pushed by a wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Active account changed; `None` means the wallet revoked access.
    AccountsChanged(Option<Address>),
    /// Wallet moved to another chain.
    ChainChanged(ChainId),
    /// Wallet closed the connection.
    Disconnected,
}

/// Handle connectors use to report wallet events.
#[derive(Debug, Clone)]
pub struct WalletEventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<Command>,
}

impl WalletEventSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { epoch, tx }
    }

    /// Attempt this sink belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Queue an event. Returns false if the session manager is gone.
    pub fn emit(&self, event: WalletEvent) -> bool {
        tracing::debug!(epoch = self.epoch, event = ?event, "Wallet event received");
        self.tx
            .send(Command::Wallet {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }

    pub fn accounts_changed(&self, account: Option<Address>) -> bool {
        self.emit(WalletEvent::AccountsChanged(account))
    }

    pub fn chain_changed(&self, chain_id: ChainId) -> bool {
        self.emit(WalletEvent::ChainChanged(chain_id))
    }

    pub fn disconnected(&self) -> bool {
        self.emit(WalletEvent::Disconnected)
    }
}
