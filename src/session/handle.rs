//! Presentation-facing handle to a running session manager.

use alloy::primitives::Bytes;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::chain::ChainId;
use crate::error::{WalletError, WalletResult};
use crate::session::command::{Command, Reply};
use crate::session::types::{Session, SessionStatus};
use crate::transport::{Transport, TransportSelector};

/// Cloneable handle used by UI layers to drive and observe the session.
///
/// Every method fails with [`WalletError::ManagerStopped`] once the manager
/// has shut down.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Session>,
    changes: broadcast::Sender<Session>,
    selector: Arc<TransportSelector>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshot: watch::Receiver<Session>,
        changes: broadcast::Sender<Session>,
        selector: Arc<TransportSelector>,
    ) -> Self {
        Self {
            commands,
            snapshot,
            changes,
            selector,
        }
    }

    /// The last committed session.
    pub fn snapshot(&self) -> Session {
        self.snapshot.borrow().clone()
    }

    /// Latest-value view of the session.
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.snapshot.clone()
    }

    /// One event per committed transition, in commit order.
    pub fn subscribe(&self) -> broadcast::Receiver<Session> {
        self.changes.subscribe()
    }

    /// Run `callback` for every committed transition on a spawned task.
    ///
    /// The task lives as long as any handle does; abort the returned
    /// `JoinHandle` to unsubscribe.
    pub fn on_change<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(Session) + Send + 'static,
    {
        let mut rx = self.changes.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(session) => callback(session),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session change listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Wait until the session satisfies `predicate`, returning that state.
    pub async fn wait_for<F>(&self, mut predicate: F) -> WalletResult<Session>
    where
        F: FnMut(&Session) -> bool,
    {
        let mut rx = self.snapshot.clone();
        let session = rx
            .wait_for(|session| predicate(session))
            .await
            .map_err(|_| WalletError::ManagerStopped)?;
        Ok(session.clone())
    }

    /// Wait until the session reaches `status`.
    pub async fn wait_for_status(&self, status: SessionStatus) -> WalletResult<Session> {
        self.wait_for(|session| session.status == status).await
    }

    /// Start connecting. Returns once the session is `Connecting`; the outcome
    /// arrives as a change event.
    pub async fn connect(&self, connector_id: &str, chain_id: Option<ChainId>) -> WalletResult<()> {
        self.request(|reply| Command::Connect {
            connector_id: connector_id.to_string(),
            chain_id,
            reply,
        })
        .await
    }

    /// Tear down the session. Always succeeds while the manager runs.
    pub async fn disconnect(&self) -> WalletResult<()> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Ask the wallet to move to `chain_id`. Returns after the wallet answered.
    ///
    /// Only one switch or signing request runs at a time; a second one fails
    /// with [`WalletError::RequestPending`]. A request still waiting when the
    /// session ends fails with [`WalletError::Cancelled`].
    pub async fn switch_chain(&self, chain_id: ChainId) -> WalletResult<()> {
        self.request(|reply| Command::SwitchChain { chain_id, reply }).await
    }

    /// Sign `message` with the connected account.
    pub async fn sign_message(&self, message: impl Into<Vec<u8>>) -> WalletResult<Bytes> {
        let message = message.into();
        self.request(|reply| Command::SignMessage { message, reply }).await
    }

    /// Transport for the chain the session is connected to.
    pub async fn transport(&self) -> WalletResult<Transport> {
        let session = self.snapshot();
        match (session.status, session.chain_id) {
            (SessionStatus::Connected, Some(chain_id)) => self.selector.resolve_verified(chain_id).await,
            (status, _) => Err(WalletError::InvalidState {
                op: "resolve transport",
                status,
            }),
        }
    }

    pub fn selector(&self) -> &Arc<TransportSelector> {
        &self.selector
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> WalletResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| WalletError::ManagerStopped)?;
        rx.await.map_err(|_| WalletError::ManagerStopped)?
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session", &*self.snapshot.borrow())
            .finish()
    }
}
