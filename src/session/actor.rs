//! The session actor: single owner of the `Session`.
//!
//! # Responsibilities
//! - Apply commands and wallet events one at a time, in arrival order
//! - Run handshakes, restores, switches and signing in spawned tasks so the
//!   queue stays live (a hung wallet prompt never blocks `disconnect`)
//! - Persist on every committed Connected/Disconnected transition
//! - Publish exactly one change event per committed transition
//!
//! # State Transitions
//! ```text
//! Disconnected/Error --connect--> Connecting --ok--> Connected
//!                                            --rejected--> Disconnected
//!                                            --failure/timeout--> Error
//! (startup, record present) --> Reconnecting --ok--> Connected
//!                                            --otherwise--> Disconnected
//! Connected --switch/accounts/chain changed--> Connected (in place)
//! any --disconnect--> Disconnected
//! ```

use alloy::primitives::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::chain::{Chain, ChainId, ChainRegistry};
use crate::config::SessionConfig;
use crate::connector::{
    Connection, Connector, ConnectorSet, HandshakeContext, WalletEvent, WalletEventSink,
};
use crate::error::{WalletError, WalletResult};
use crate::observability::metrics;
use crate::lifecycle::ShutdownSignal;
use crate::resilience::restore_delay;
use crate::session::command::{Command, Reply};
use crate::session::types::{Session, SessionStatus};
use crate::storage::SessionStore;
use crate::transport::TransportSelector;

pub(crate) struct SessionActor {
    registry: Arc<ChainRegistry>,
    selector: Arc<TransportSelector>,
    connectors: Arc<ConnectorSet>,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    session: Session,
    /// Bumped on every connect, restore and disconnect.
    epoch: u64,
    active: Option<Arc<dyn Connector>>,
    in_flight: Option<JoinHandle<()>>,
    /// Switch or sign request waiting on the wallet. At most one.
    pending: Option<PendingRequest>,
    /// Wallet events that arrived while a transition was running.
    deferred: VecDeque<(u64, WalletEvent)>,
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Sender<Session>,
    changes: broadcast::Sender<Session>,
}

struct PendingRequest {
    epoch: u64,
    reply: PendingReply,
    task: JoinHandle<()>,
}

enum PendingReply {
    Switch(Reply<()>),
    Sign(Reply<Bytes>),
}

impl PendingReply {
    fn fail(self, error: WalletError) {
        match self {
            PendingReply::Switch(reply) => {
                let _ = reply.send(Err(error));
            }
            PendingReply::Sign(reply) => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

impl SessionActor {
    pub(crate) fn new(
        selector: Arc<TransportSelector>,
        connectors: Arc<ConnectorSet>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
        commands: mpsc::UnboundedSender<Command>,
        snapshot: watch::Sender<Session>,
        changes: broadcast::Sender<Session>,
    ) -> Self {
        Self {
            registry: selector.registry().clone(),
            selector,
            connectors,
            store,
            config,
            session: Session::disconnected(),
            epoch: 0,
            active: None,
            in_flight: None,
            pending: None,
            deferred: VecDeque::new(),
            commands,
            snapshot,
            changes,
        }
    }

    /// Rehydrate the persisted session. Called once, before the actor loop starts.
    pub(crate) fn restore_persisted(&mut self) {
        let record = match self.store.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No persisted session");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable session record");
                self.clear_persisted();
                return;
            }
        };

        let connector = match self.connectors.get(&record.connector_id) {
            Ok(connector) => connector,
            Err(_) => {
                tracing::info!(connector = %record.connector_id, "Persisted connector no longer configured");
                self.clear_persisted();
                return;
            }
        };
        let chain = match self.registry.get(record.chain_id) {
            Ok(chain) => chain.clone(),
            Err(_) => {
                tracing::info!(chain_id = %record.chain_id, "Persisted chain no longer registered");
                self.clear_persisted();
                return;
            }
        };

        self.epoch += 1;
        self.active = Some(connector.clone());
        self.commit(Session::reconnecting(&record));

        let epoch = self.epoch;
        let events = WalletEventSink::new(epoch, self.commands.clone());
        let selector = self.selector.clone();
        let config = self.config.clone();
        let commands = self.commands.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = run_restore(selector, connector, chain, events, config).await;
            let _ = commands.send(Command::RestoreFinished { epoch, result });
        }));
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut shutdown: ShutdownSignal,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = shutdown.wait() => {
                    tracing::info!("Session manager received shutdown signal, exiting loop");
                    break;
                }
            }
        }
        self.stop().await;
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Connect {
                connector_id,
                chain_id,
                reply,
            } => {
                let _ = reply.send(self.handle_connect(&connector_id, chain_id));
            }
            Command::Disconnect { reply } => {
                self.handle_disconnect().await;
                let _ = reply.send(Ok(()));
            }
            Command::SwitchChain { chain_id, reply } => self.handle_switch_chain(chain_id, reply),
            Command::SignMessage { message, reply } => self.handle_sign(message, reply),
            Command::Wallet { epoch, event } => self.handle_wallet_event(epoch, event).await,
            Command::HandshakeFinished { epoch, result } => {
                self.handle_handshake_finished(epoch, result).await
            }
            Command::RestoreFinished { epoch, result } => {
                self.handle_restore_finished(epoch, result).await
            }
            Command::SwitchFinished {
                epoch,
                chain_id,
                result,
            } => self.handle_switch_finished(epoch, chain_id, result),
            Command::SignFinished { epoch, result } => self.handle_sign_finished(epoch, result),
        }
    }

    fn handle_connect(&mut self, connector_id: &str, chain_id: Option<ChainId>) -> WalletResult<()> {
        let status = self.session.status;
        if status.is_transitioning() {
            return Err(WalletError::TransitionInProgress(status));
        }
        if status == SessionStatus::Connected {
            return Err(WalletError::InvalidState { op: "connect", status });
        }

        let connector = self.connectors.get(connector_id)?;
        let chain = match chain_id {
            Some(id) => self.registry.get(id)?.clone(),
            None => self.registry.default_chain().cloned().ok_or(WalletError::NoChains)?,
        };

        self.epoch += 1;
        self.deferred.clear();
        self.active = Some(connector.clone());
        self.commit(Session::connecting(connector_id, chain.id));

        let epoch = self.epoch;
        let events = WalletEventSink::new(epoch, self.commands.clone());
        let selector = self.selector.clone();
        let limit = self.config.connect_timeout();
        let commands = self.commands.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = run_handshake(selector, connector, chain, events, limit).await;
            let _ = commands.send(Command::HandshakeFinished { epoch, result });
        }));
        Ok(())
    }

    async fn handle_handshake_finished(&mut self, epoch: u64, result: WalletResult<Connection>) {
        if epoch != self.epoch || self.session.status != SessionStatus::Connecting {
            tracing::debug!(epoch, current = self.epoch, "Ignoring stale handshake result");
            return;
        }
        self.in_flight = None;
        let connector_id = self.session.connector_id.clone().unwrap_or_default();

        match result {
            Ok(conn) => match conn.account() {
                Some(account) if self.registry.contains(conn.chain_id) => {
                    tracing::info!(
                        connector = %connector_id,
                        chain_id = %conn.chain_id,
                        account = %account,
                        "Wallet connected"
                    );
                    let next = Session::connected(connector_id, conn.chain_id, account);
                    self.persist(&next);
                    self.commit(next);
                }
                Some(_) => self.fail_attempt(WalletError::UnknownChain(conn.chain_id)).await,
                None => {
                    self.fail_attempt(WalletError::WalletCommunication(
                        "wallet returned no accounts".to_string(),
                    ))
                    .await
                }
            },
            Err(WalletError::UserRejected(reason)) => {
                tracing::info!(connector = %connector_id, reason = %reason, "User rejected connection");
                self.teardown_active().await;
                self.enter_disconnected();
            }
            Err(e) => self.fail_attempt(e).await,
        }

        self.replay_deferred().await;
    }

    async fn handle_restore_finished(&mut self, epoch: u64, result: WalletResult<Option<Connection>>) {
        if epoch != self.epoch || self.session.status != SessionStatus::Reconnecting {
            tracing::debug!(epoch, current = self.epoch, "Ignoring stale restore result");
            return;
        }
        self.in_flight = None;
        let connector_id = self.session.connector_id.clone().unwrap_or_default();

        let mut transient = false;
        let restored = match (result, self.session.account) {
            (Ok(Some(conn)), Some(account))
                if conn.accounts.contains(&account) && self.registry.contains(conn.chain_id) =>
            {
                Some(Session::connected(connector_id.clone(), conn.chain_id, account))
            }
            (Ok(Some(_)), _) => {
                tracing::info!(connector = %connector_id, "Persisted account or chain no longer available");
                None
            }
            (Ok(None), _) => {
                tracing::info!(connector = %connector_id, "Wallet no longer authorized");
                None
            }
            (Err(e), _) => {
                tracing::warn!(connector = %connector_id, error = %e, "Session restore failed");
                transient = e.is_retryable();
                None
            }
        };

        match restored {
            Some(next) => {
                tracing::info!(connector = %connector_id, chain_id = ?next.chain_id, "Session restored");
                self.persist(&next);
                self.commit(next);
            }
            None if transient => {
                // The wallet may still authorize us; keep its permissions.
                self.release_active().await;
                self.enter_disconnected();
            }
            None => {
                self.teardown_active().await;
                self.enter_disconnected();
            }
        }

        self.replay_deferred().await;
    }

    async fn handle_disconnect(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.cancel_pending();
        self.epoch += 1;
        self.deferred.clear();
        self.teardown_active().await;
        self.enter_disconnected();
    }

    fn handle_switch_chain(&mut self, chain_id: ChainId, reply: Reply<()>) {
        let (connector, chain) = match self.prepare_switch(chain_id) {
            Ok(Some(target)) => target,
            Ok(None) => {
                let _ = reply.send(Ok(()));
                return;
            }
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };

        let epoch = self.epoch;
        let limit = self.config.request_timeout();
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            let result = match timeout(limit, connector.switch_chain(&chain)).await {
                Ok(result) => result.map_err(WalletError::from),
                Err(_) => Err(WalletError::WalletCommunication(format!(
                    "wallet did not answer switch to chain {} within {:?}",
                    chain.id, limit
                ))),
            };
            let _ = commands.send(Command::SwitchFinished {
                epoch,
                chain_id: chain.id,
                result,
            });
        });
        self.pending = Some(PendingRequest {
            epoch,
            reply: PendingReply::Switch(reply),
            task,
        });
    }

    /// Validate a switch. `Ok(None)` means the session is already on `chain_id`.
    fn prepare_switch(&self, chain_id: ChainId) -> WalletResult<Option<(Arc<dyn Connector>, Chain)>> {
        let status = self.session.status;
        if status != SessionStatus::Connected {
            return Err(WalletError::InvalidState { op: "switch chain", status });
        }
        let chain = self.registry.get(chain_id)?.clone();
        if self.session.chain_id == Some(chain_id) {
            return Ok(None);
        }
        if self.pending.is_some() {
            return Err(WalletError::RequestPending);
        }
        let connector = self
            .active
            .clone()
            .ok_or(WalletError::InvalidState { op: "switch chain", status })?;
        Ok(Some((connector, chain)))
    }

    fn handle_switch_finished(&mut self, epoch: u64, chain_id: ChainId, result: WalletResult<()>) {
        let Some(PendingReply::Switch(reply)) = self.take_pending(epoch) else {
            tracing::debug!(epoch, current = self.epoch, "Ignoring stale switch result");
            return;
        };

        match result {
            Ok(()) => {
                if self.session.is_connected() && self.session.chain_id != Some(chain_id) {
                    tracing::info!(from = ?self.session.chain_id, to = %chain_id, "Chain switched");
                    let mut next = self.session.clone();
                    next.chain_id = Some(chain_id);
                    self.persist(&next);
                    self.commit(next);
                }
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                tracing::info!(chain_id = %chain_id, error = %e, "Chain switch declined");
                let _ = reply.send(Err(e));
            }
        }
    }

    fn handle_sign(&mut self, message: Vec<u8>, reply: Reply<Bytes>) {
        let status = self.session.status;
        let (SessionStatus::Connected, Some(account), Some(connector)) =
            (status, self.session.account, self.active.clone())
        else {
            let _ = reply.send(Err(WalletError::InvalidState { op: "sign", status }));
            return;
        };
        if self.pending.is_some() {
            let _ = reply.send(Err(WalletError::RequestPending));
            return;
        }

        let epoch = self.epoch;
        let limit = self.config.request_timeout();
        let commands = self.commands.clone();
        let task = tokio::spawn(async move {
            let result = match timeout(limit, connector.sign_request(account, &message)).await {
                Ok(result) => result.map_err(WalletError::from),
                Err(_) => Err(WalletError::WalletCommunication(format!(
                    "wallet did not answer signing request within {:?}",
                    limit
                ))),
            };
            let _ = commands.send(Command::SignFinished { epoch, result });
        });
        self.pending = Some(PendingRequest {
            epoch,
            reply: PendingReply::Sign(reply),
            task,
        });
    }

    fn handle_sign_finished(&mut self, epoch: u64, result: WalletResult<Bytes>) {
        let Some(PendingReply::Sign(reply)) = self.take_pending(epoch) else {
            tracing::debug!(epoch, current = self.epoch, "Ignoring stale signing result");
            return;
        };
        if let Err(e) = &result {
            tracing::info!(error = %e, "Signing request failed");
        }
        let _ = reply.send(result);
    }

    fn take_pending(&mut self, epoch: u64) -> Option<PendingReply> {
        if self.pending.as_ref().map(|p| p.epoch) != Some(epoch) {
            return None;
        }
        self.pending.take().map(|p| p.reply)
    }

    /// Abort the pending wallet request and fail its caller.
    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(epoch = pending.epoch, "Cancelling pending wallet request");
            pending.task.abort();
            pending.reply.fail(WalletError::Cancelled);
        }
    }

    async fn handle_wallet_event(&mut self, epoch: u64, event: WalletEvent) {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, event = ?event, "Dropping event from stale wallet session");
            return;
        }
        match self.session.status {
            SessionStatus::Connecting | SessionStatus::Reconnecting => {
                self.deferred.push_back((epoch, event));
                return;
            }
            SessionStatus::Connected => {}
            status => {
                tracing::debug!(status = %status, event = ?event, "Ignoring wallet event");
                return;
            }
        }

        match event {
            WalletEvent::AccountsChanged(Some(account)) => {
                if self.session.account == Some(account) {
                    return;
                }
                tracing::info!(account = %account, "Wallet account changed");
                let mut next = self.session.clone();
                next.account = Some(account);
                self.persist(&next);
                self.commit(next);
            }
            WalletEvent::AccountsChanged(None) | WalletEvent::Disconnected => {
                tracing::info!("Wallet dropped the connection");
                self.handle_disconnect().await;
            }
            WalletEvent::ChainChanged(chain_id) => {
                if self.session.chain_id == Some(chain_id) {
                    return;
                }
                if !self.registry.contains(chain_id) {
                    tracing::warn!(chain_id = %chain_id, "Wallet moved to an unregistered chain");
                    self.cancel_pending();
                    self.epoch += 1;
                    self.teardown_active().await;
                    self.clear_persisted();
                    let next = Session::failed(
                        self.session.connector_id.clone(),
                        self.session.chain_id,
                        WalletError::UnknownChain(chain_id).to_string(),
                    );
                    self.commit(next);
                    return;
                }
                tracing::info!(chain_id = %chain_id, "Wallet chain changed");
                let mut next = self.session.clone();
                next.chain_id = Some(chain_id);
                self.persist(&next);
                self.commit(next);
            }
        }
    }

    async fn replay_deferred(&mut self) {
        while let Some((epoch, event)) = self.deferred.pop_front() {
            self.handle_wallet_event(epoch, event).await;
        }
    }

    async fn fail_attempt(&mut self, error: WalletError) {
        tracing::warn!(
            connector = ?self.session.connector_id,
            chain_id = ?self.session.chain_id,
            error = %error,
            retryable = error.is_retryable(),
            "Connection attempt failed"
        );
        if error.is_retryable() {
            self.release_active().await;
        } else {
            self.teardown_active().await;
        }
        let next = Session::failed(
            self.session.connector_id.clone(),
            self.session.chain_id,
            error.to_string(),
        );
        self.commit(next);
    }

    async fn teardown_active(&mut self) {
        if let Some(connector) = self.active.take() {
            if timeout(self.config.request_timeout(), connector.teardown()).await.is_err() {
                tracing::warn!(connector = %connector.id(), "Connector teardown timed out");
            }
        }
    }

    async fn release_active(&mut self) {
        if let Some(connector) = self.active.take() {
            if timeout(self.config.request_timeout(), connector.release()).await.is_err() {
                tracing::warn!(connector = %connector.id(), "Connector release timed out");
            }
        }
    }

    fn enter_disconnected(&mut self) {
        self.clear_persisted();
        if self.session != Session::disconnected() {
            self.commit(Session::disconnected());
        }
    }

    fn persist(&self, session: &Session) {
        if let Some(record) = session.persisted() {
            if let Err(e) = self.store.save(&record) {
                tracing::error!(error = %e, "Failed to persist session");
            }
        }
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
    }

    fn commit(&mut self, next: Session) {
        tracing::info!(
            from = %self.session.status,
            to = %next.status,
            connector = ?next.connector_id,
            chain_id = ?next.chain_id,
            "Session transition"
        );
        metrics::record_transition(next.status);
        self.session = next.clone();
        self.snapshot.send_replace(next.clone());
        let _ = self.changes.send(next);
    }

    /// Abort in-flight work and release the connector without revoking. The
    /// persisted record is kept so the next start can restore it.
    async fn stop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        self.cancel_pending();
        self.release_active().await;
        tracing::info!(status = %self.session.status, "Session manager stopped");
    }
}

async fn run_handshake(
    selector: Arc<TransportSelector>,
    connector: Arc<dyn Connector>,
    chain: Chain,
    events: WalletEventSink,
    limit: Duration,
) -> WalletResult<Connection> {
    let attempt = async {
        let transport = selector.resolve_verified(chain.id).await?;
        let ctx = HandshakeContext {
            chain,
            transport,
            events,
        };
        connector.request_accounts(&ctx).await.map_err(WalletError::from)
    };

    match timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(WalletError::WalletCommunication(format!(
            "wallet did not respond within {:?}",
            limit
        ))),
    }
}

async fn run_restore(
    selector: Arc<TransportSelector>,
    connector: Arc<dyn Connector>,
    chain: Chain,
    events: WalletEventSink,
    config: SessionConfig,
) -> WalletResult<Option<Connection>> {
    let limit = config.reconnect_timeout();
    let mut last_error = WalletError::WalletCommunication("restore was not attempted".to_string());

    for attempt in 0..config.reconnect_attempts {
        if attempt > 0 {
            let delay = restore_delay(&config, attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying session restore");
            sleep(delay).await;
        }

        let restore = async {
            let transport = selector.resolve_verified(chain.id).await?;
            let ctx = HandshakeContext {
                chain: chain.clone(),
                transport,
                events: events.clone(),
            };
            connector.restore(&ctx).await.map_err(WalletError::from)
        };

        match timeout(limit, restore).await {
            Ok(Ok(restored)) => return Ok(restored),
            Ok(Err(WalletError::UserRejected(reason))) => return Err(WalletError::UserRejected(reason)),
            Ok(Err(e)) => last_error = e,
            Err(_) => {
                last_error =
                    WalletError::WalletCommunication(format!("restore attempt timed out after {:?}", limit))
            }
        }
        tracing::debug!(attempt, error = %last_error, "Restore attempt failed");
    }

    Err(last_error)
}
