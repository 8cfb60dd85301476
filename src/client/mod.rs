//! Async GC client.
//!
//! [`GcClient`] is a thin handle to a background driver task that owns the
//! [`GcSession`]. The driver is the single owner of all session state:
//! transport notifications, retry timer ticks and caller commands are
//! multiplexed with `tokio::select!` and handled one at a time, each running
//! to completion before the next.
//!
//! ```text
//!  TransportEvent (mpsc) ──┐
//!  retry deadline (sleep) ─┼──> driver task ──> GcSession ──> GcEvent (mpsc)
//!  Command (mpsc) ─────────┘                       │
//!                                                  └──> watch<SessionSnapshot>
//! ```
//!
//! The retry deadline is recomputed from the session on every iteration, so
//! a retry cancelled while handling one event can never fire afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! let (client, mut events) = GcClient::start(transport, transport_events, &config.session);
//! client.launch().await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         GcEvent::Connected => client.request_active_matches().await?,
//!         GcEvent::ActiveMatches(response) => println!("{}", response.active_matches.len()),
//!         GcEvent::SessionLost { .. } => {},
//!     }
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::error::{GcError, Result};
use crate::protocol::{GcEvent, GcSession, MessageRouter, SessionState, SessionStats};
use crate::transport::{Transport, TransportEvent};

/// Point-in-time view of the session published by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current state
    pub state: SessionState,
    /// Counters
    pub stats: SessionStats,
}

type Ack = oneshot::Sender<Result<()>>;

enum Command {
    Launch(Ack),
    RequestActiveMatches(Ack),
    Quit(Ack),
    Shutdown,
}

/// Handle to a running GC session.
pub struct GcClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl GcClient {
    /// Spawn the driver task and return a handle plus the event receiver.
    ///
    /// `transport_events` is the receiving half of the transport's
    /// notification channel; the transport keeps only the sending half.
    pub fn start<T: Transport + 'static>(
        transport: Arc<T>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        config: &SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<GcEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(SessionSnapshot::default());

        tracing::debug!(
            "Starting GC client for app {} on {} transport",
            config.app_id,
            transport.name()
        );
        let session = GcSession::new(config, transport, event_tx);
        let task = tokio::spawn(drive(session, cmd_rx, transport_events, snapshot_tx));

        let client = Self {
            cmd_tx,
            snapshot,
            task: Some(task),
        };
        (client, event_rx)
    }

    /// Ask the transport to start the target application.
    pub async fn launch(&self) -> Result<()> {
        self.call(Command::Launch).await
    }

    /// Send the active-matches request.
    ///
    /// Returns [`GcError::NoIdentity`] when nothing could be sent.
    pub async fn request_active_matches(&self) -> Result<()> {
        self.call(Command::RequestActiveMatches).await
    }

    /// Stop playing the application and drop the session.
    pub async fn quit(&self) -> Result<()> {
        self.call(Command::Quit).await
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    /// Whether a coordinator session is held.
    pub fn has_session(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Session counters.
    pub fn stats(&self) -> SessionStats {
        self.snapshot.borrow().stats
    }

    /// Wait until the session is connected.
    pub async fn wait_for_session(&self) -> Result<()> {
        let mut snapshot = self.snapshot.clone();
        snapshot
            .wait_for(|s| s.state == SessionState::Connected)
            .await
            .map(|_| ())
            .map_err(|_| GcError::ClientClosed)
    }

    /// Stop the driver task and wait for it to exit.
    pub async fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("GC client driver ended abnormally: {}", e);
            }
        }
    }

    async fn call(&self, command: impl FnOnce(Ack) -> Command) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(command(ack_tx))
            .map_err(|_| GcError::ClientClosed)?;
        ack_rx.await.map_err(|_| GcError::ClientClosed)?
    }
}

impl std::fmt::Debug for GcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcClient")
            .field("snapshot", &*self.snapshot.borrow())
            .field("running", &self.task.is_some())
            .finish()
    }
}

impl Drop for GcClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Driver loop: the single owner of the session.
async fn drive<T: Transport + ?Sized>(
    mut session: GcSession<T>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
) {
    let router = MessageRouter::new();
    tracing::debug!("GC client driver started");

    loop {
        let deadline = session.next_deadline();

        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Launch(ack)) => {
                    let _ = ack.send(session.launch());
                },
                Some(Command::RequestActiveMatches(ack)) => {
                    let _ = ack.send(session.request_active_matches());
                },
                Some(Command::Quit(ack)) => {
                    let _ = ack.send(session.quit());
                },
                Some(Command::Shutdown) | None => break,
            },

            event = transport_rx.recv() => match event {
                Some(TransportEvent::AppLaunched(app_id)) => {
                    session.on_application_launched(app_id, Instant::now());
                },
                Some(TransportEvent::MessageReceived(envelope)) => {
                    match router.dispatch(&envelope, &mut session, Instant::now()) {
                        Ok(outcome) => tracing::trace!("Dispatched {}: {:?}", envelope.msg_type, outcome),
                        Err(e) => tracing::warn!("Dropping GC message {}: {}", envelope.msg_type, e),
                    }
                },
                None => {
                    tracing::debug!("Transport event channel closed");
                    break;
                },
            },

            () = retry_tick(deadline) => {
                session.poll_retry(Instant::now());
            },
        }

        let current = SessionSnapshot {
            state: session.state(),
            stats: session.stats(),
        };
        snapshot_tx.send_if_modified(|snapshot| {
            let changed = *snapshot != current;
            *snapshot = current;
            changed
        });
    }

    tracing::debug!("GC client driver exited");
}

async fn retry_tick(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, SimulatedCoordinator};

    const APP: u32 = 1422450;

    #[tokio::test(start_paused = true)]
    async fn test_launch_connects() {
        let (transport, rx) = MemoryTransport::with_coordinator(SimulatedCoordinator::new(APP));
        let (client, mut events) = GcClient::start(transport, rx, &SessionConfig::default());

        client.launch().await.unwrap();
        assert_eq!(events.recv().await, Some(GcEvent::Connected));

        client.wait_for_session().await.unwrap();
        assert!(client.has_session());
        assert_eq!(client.stats().hellos_sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_without_identity_not_sent() {
        let (transport, rx) = MemoryTransport::new();
        transport.set_identity(false);
        let (client, _events) = GcClient::start(transport, rx, &SessionConfig::default());

        let err = client.request_active_matches().await.unwrap_err();
        assert!(err.is_not_sent());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_after_shutdown_fail() {
        let (transport, rx) = MemoryTransport::new();
        let (mut client, _events) = GcClient::start(transport, rx, &SessionConfig::default());

        client.shutdown().await;
        assert!(matches!(client.launch().await, Err(GcError::ClientClosed)));
        // Double shutdown is harmless
        client.shutdown().await;
    }
}
