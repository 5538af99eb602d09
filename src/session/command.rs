//! Messages processed by the session actor, in arrival order.

use alloy::primitives::Bytes;
use tokio::sync::oneshot;

use crate::chain::ChainId;
use crate::connector::{Connection, WalletEvent};
use crate::error::WalletResult;

pub(crate) type Reply<T> = oneshot::Sender<WalletResult<T>>;

pub(crate) enum Command {
    Connect {
        connector_id: String,
        chain_id: Option<ChainId>,
        reply: Reply<()>,
    },
    Disconnect {
        reply: Reply<()>,
    },
    SwitchChain {
        chain_id: ChainId,
        reply: Reply<()>,
    },
    SignMessage {
        message: Vec<u8>,
        reply: Reply<Bytes>,
    },
    /// Unsolicited event from the wallet of attempt `epoch`.
    Wallet { epoch: u64, event: WalletEvent },
    /// A spawned connect handshake finished.
    HandshakeFinished {
        epoch: u64,
        result: WalletResult<Connection>,
    },
    /// A spawned startup restore finished.
    RestoreFinished {
        epoch: u64,
        result: WalletResult<Option<Connection>>,
    },
    /// A spawned chain switch finished.
    SwitchFinished {
        epoch: u64,
        chain_id: ChainId,
        result: WalletResult<()>,
    },
    /// A spawned signing request finished.
    SignFinished {
        epoch: u64,
        result: WalletResult<Bytes>,
    },
}
