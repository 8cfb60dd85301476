//! GC session state machine.
//!
//! Owns the hello/welcome handshake, the retry backoff and connection-status
//! monitoring for one coordinator application. All methods take `&mut self`
//! and run to completion; the caller serialises transport events, timer
//! ticks and commands onto one owner (see [`GcClient`](crate::GcClient)).
//!
//! The pending retry doubles as the guard against duplicate handshake
//! sequences: at most one is in flight per session.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use prost::Message;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::backoff::BackoffSchedule;
use super::message::GcMessageType;
use super::proto::{
    CMsgClientHello, CMsgClientToGcGetActiveMatches, CMsgClientToGcGetActiveMatchesResponse,
    GcConnectionStatus,
};
use crate::codec::MessageCodec;
use crate::config::SessionConfig;
use crate::error::{GcError, Result};
use crate::transport::{Framing, Transport};

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Application not launched on the transport
    #[default]
    NotLaunched,
    /// Launched, hello retry sequence in progress
    AwaitingHandshake,
    /// Coordinator session established
    Connected,
}

/// Notification emitted to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum GcEvent {
    /// GC session (re)established; once per handshake cycle
    Connected,
    /// A connected session was reported lost
    SessionLost {
        /// Status that reported the loss
        status: GcConnectionStatus,
    },
    /// Decoded active-matches response
    ActiveMatches(CMsgClientToGcGetActiveMatchesResponse),
}

/// Pending hello attempt.
#[derive(Debug, Clone, Copy)]
struct RetryTimer {
    due: Instant,
    backoff: BackoffSchedule,
}

/// GC session
pub struct GcSession<T: Transport + ?Sized> {
    app_id: u32,
    transport: Arc<T>,
    codec: MessageCodec,
    events: mpsc::UnboundedSender<GcEvent>,
    first_hello_delay: Duration,
    backoff_initial: Duration,
    backoff_max: Duration,
    state: SessionState,
    retry: Option<RetryTimer>,
    stats: SessionStats,
}

impl<T: Transport + ?Sized> GcSession<T> {
    /// Create a session for `config.app_id`
    pub fn new(
        config: &SessionConfig,
        transport: Arc<T>,
        events: mpsc::UnboundedSender<GcEvent>,
    ) -> Self {
        Self {
            app_id: config.app_id,
            transport,
            codec: MessageCodec::with_max_decompressed(config.max_decompressed_bytes),
            events,
            first_hello_delay: config.first_hello_delay(),
            backoff_initial: config.hello_backoff_initial(),
            backoff_max: config.hello_backoff_max(),
            state: SessionState::NotLaunched,
            retry: None,
            stats: SessionStats::default(),
        }
    }

    /// Target application
    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if a coordinator session is held
    pub fn has_session(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Check if a hello attempt is scheduled
    pub fn retry_pending(&self) -> bool {
        self.retry.is_some()
    }

    /// When the pending hello attempt is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.retry.map(|t| t.due)
    }

    /// Delay used for the most recent retry of the current sequence
    pub fn current_backoff(&self) -> Option<Duration> {
        self.retry.and_then(|t| t.backoff.previous())
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Payload codec shared with the router
    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    /// Ask the transport to start playing the target application
    pub fn launch(&self) -> Result<()> {
        tracing::debug!("Launching app {}", self.app_id);
        self.transport.set_played_applications(&[self.app_id])
    }

    /// Stop playing the target application and drop the session
    pub fn quit(&mut self) -> Result<()> {
        self.on_application_stopped();
        self.transport.set_played_applications(&[])
    }

    /// Handle the transport's "application launched" notification
    pub fn on_application_launched(&mut self, app_id: u32, now: Instant) {
        if app_id != self.app_id || self.state != SessionState::NotLaunched {
            return;
        }

        tracing::debug!("App {} launched", app_id);
        self.state = SessionState::AwaitingHandshake;
        self.start_handshake(now);
    }

    /// The application is no longer launched: cancel any retry and drop the session
    pub fn on_application_stopped(&mut self) {
        if self.state == SessionState::NotLaunched {
            return;
        }

        tracing::debug!("App {} stopped", self.app_id);
        self.cancel_retry();
        self.state = SessionState::NotLaunched;
    }

    /// Fire the pending hello attempt if it is due. Returns whether it fired.
    pub fn poll_retry(&mut self, now: Instant) -> bool {
        match self.retry {
            Some(timer) if timer.due <= now => {
                self.begin_handshake(now);
                true
            },
            _ => false,
        }
    }

    /// Handle the coordinator's welcome
    ///
    /// A welcome arriving after the application stopped (a reply to a hello
    /// sent before `quit`) is ignored.
    pub fn on_welcome(&mut self) {
        if self.state == SessionState::NotLaunched {
            tracing::debug!("Ignoring GC welcome: app {} not launched", self.app_id);
            return;
        }

        tracing::info!("Received client welcome from GC");
        self.mark_connected();
    }

    /// Handle a connection status update
    pub fn on_connection_status(&mut self, status: GcConnectionStatus, now: Instant) {
        tracing::debug!(
            "GC connection status {:?} (has_session={}, retry_pending={})",
            status,
            self.has_session(),
            self.retry_pending()
        );

        if status.has_session() {
            // Only a pending retry means the welcome was missed
            if self.retry.is_some() {
                tracing::info!("GC connection regained");
                self.mark_connected();
            }
            return;
        }

        if self.retry.is_some() {
            return;
        }

        if self.state == SessionState::Connected {
            tracing::warn!("Disconnected from GC ({:?}), trying to reconnect", status);
            self.state = SessionState::AwaitingHandshake;
            self.stats.losses += 1;
            self.emit(GcEvent::SessionLost { status });
        }
        self.begin_handshake(now);
    }

    /// Encode `body` and send it to the coordinator
    pub fn send<M: Message>(&self, msg_type: impl Into<u32>, body: &M) -> Result<()> {
        self.send_framed(msg_type.into(), Framing::Protobuf, self.codec.encode(body))
    }

    /// Send a pre-built binary payload to the coordinator
    pub fn send_raw(&self, msg_type: impl Into<u32>, payload: Bytes) -> Result<()> {
        self.send_framed(msg_type.into(), Framing::Raw, payload)
    }

    /// Request the list of active matches; the answer arrives as [`GcEvent::ActiveMatches`]
    pub fn request_active_matches(&self) -> Result<()> {
        self.send(GcMessageType::GetActiveMatches, &CMsgClientToGcGetActiveMatches {})
    }

    /// Emit an event to the caller
    pub(crate) fn emit(&self, event: GcEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }

    fn send_framed(&self, msg_type: u32, framing: Framing, payload: Bytes) -> Result<()> {
        if !self.transport.has_identity() {
            return Err(GcError::NoIdentity);
        }
        self.transport
            .send_to_gc(self.app_id, msg_type, framing, payload)
    }

    /// Schedule the first hello of a new sequence unless one is in flight
    fn start_handshake(&mut self, now: Instant) {
        if self.retry.is_some() {
            tracing::debug!("Not starting handshake: retry already pending");
            return;
        }

        self.retry = Some(RetryTimer {
            due: now + self.first_hello_delay,
            backoff: BackoffSchedule::new(self.backoff_initial, self.backoff_max),
        });
    }

    fn begin_handshake(&mut self, now: Instant) {
        if self.state != SessionState::AwaitingHandshake {
            tracing::debug!(
                "Not sending hello: {}",
                if self.state == SessionState::Connected {
                    "we have a session"
                } else {
                    "app no longer launched"
                }
            );
            self.cancel_retry();
            return;
        }

        match self.send(GcMessageType::ClientHello, &CMsgClientHello::default()) {
            Ok(()) => self.stats.hellos_sent += 1,
            Err(e) => {
                self.stats.hellos_not_sent += 1;
                tracing::debug!("Hello not sent: {}", e);
            },
        }

        let mut backoff = self.retry.take().map_or_else(
            || BackoffSchedule::new(self.backoff_initial, self.backoff_max),
            |t| t.backoff,
        );
        let delay = backoff.next_delay();
        self.retry = Some(RetryTimer {
            due: now + delay,
            backoff,
        });

        tracing::info!(
            "Sending hello, setting timer for next attempt to {} ms",
            delay.as_millis()
        );
    }

    fn mark_connected(&mut self) {
        self.cancel_retry();
        self.state = SessionState::Connected;
        self.stats.connections += 1;
        self.emit(GcEvent::Connected);
    }

    fn cancel_retry(&mut self) {
        self.retry = None;
    }
}

/// Session statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Hellos handed to the transport
    pub hellos_sent: u64,
    /// Hello attempts skipped because nothing could be sent
    pub hellos_not_sent: u64,
    /// Times the session became connected
    pub connections: u64,
    /// Times a connected session was reported lost
    pub losses: u64,
}
