//! Session manager lifecycle: spawn the actor, hand out handles, shut down.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::connector::ConnectorSet;
use crate::lifecycle::Shutdown;
use crate::session::actor::SessionActor;
use crate::session::handle::SessionHandle;
use crate::session::types::Session;
use crate::storage::SessionStore;
use crate::transport::TransportSelector;

/// Owner of the session actor task.
///
/// Dropping the manager without calling [`shutdown`](Self::shutdown) also
/// stops the actor.
pub struct SessionManager {
    handle: SessionHandle,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl SessionManager {
    /// Spawn the actor and restore the persisted session, if any.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        selector: Arc<TransportSelector>,
        connectors: ConnectorSet,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Session::disconnected());
        let (changes_tx, _) = broadcast::channel(config.event_buffer.max(1));
        let shutdown = Shutdown::new();

        let handle = SessionHandle::new(
            commands_tx.clone(),
            snapshot_rx,
            changes_tx.clone(),
            selector.clone(),
        );

        let mut actor = SessionActor::new(
            selector,
            Arc::new(connectors),
            store,
            config,
            commands_tx,
            snapshot_tx,
            changes_tx,
        );
        actor.restore_persisted();

        let task = tokio::spawn(actor.run(commands_rx, shutdown.signal()));
        tracing::info!("Session manager started");

        Self {
            handle,
            shutdown,
            task,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop the actor and wait for it to exit. The persisted record is kept.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session actor did not exit cleanly");
        }
    }
}
