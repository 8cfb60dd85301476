//! In-process transport.
//!
//! Records recent outbound messages, reports launches for newly played
//! applications, and optionally routes outbound messages through a
//! [`SimulatedCoordinator`] whose replies come back as inbound events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::{Framing, SimulatedCoordinator, Transport, TransportEvent};
use crate::error::{GcError, Result};
use crate::protocol::{GcMessageType, InboundEnvelope};

/// Number of outbound messages kept by default; older ones are discarded.
pub const DEFAULT_SENT_LOG_CAPACITY: usize = 1024;

/// A message handed to [`Transport::send_to_gc`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Target application
    pub app_id: u32,
    /// Message type
    pub msg_type: u32,
    /// Framing requested by the sender
    pub framing: Framing,
    /// Encoded body
    pub payload: Bytes,
    /// When the message was sent
    pub at: Instant,
}

struct Inner {
    identity: bool,
    played: Vec<u32>,
    sent: VecDeque<SentMessage>,
    sent_capacity: usize,
    coordinator: Option<SimulatedCoordinator>,
}

/// In-memory [`Transport`] implementation.
pub struct MemoryTransport {
    events: mpsc::UnboundedSender<TransportEvent>,
    inner: Mutex<Inner>,
}

impl MemoryTransport {
    /// Create a transport with an identity and no coordinator.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        Self::build(None)
    }

    /// Create a transport whose outbound messages reach `coordinator`.
    pub fn with_coordinator(
        coordinator: SimulatedCoordinator,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        Self::build(Some(coordinator))
    }

    fn build(
        coordinator: Option<SimulatedCoordinator>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            events,
            inner: Mutex::new(Inner {
                identity: true,
                played: Vec::new(),
                sent: VecDeque::new(),
                sent_capacity: DEFAULT_SENT_LOG_CAPACITY,
                coordinator,
            }),
        };
        (Arc::new(transport), rx)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Grant or revoke the transport identity.
    pub fn set_identity(&self, identity: bool) {
        self.lock().identity = identity;
    }

    /// Keep at most `capacity` outbound messages (oldest dropped first).
    pub fn set_sent_log_capacity(&self, capacity: usize) {
        let mut inner = self.lock();
        inner.sent_capacity = capacity;
        let excess = inner.sent.len().saturating_sub(capacity);
        inner.sent.drain(..excess);
    }

    /// Recorded outbound messages, oldest first.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.iter().cloned().collect()
    }

    /// Sent messages of one type.
    pub fn sent_of_type(&self, msg_type: GcMessageType) -> Vec<SentMessage> {
        self.lock()
            .sent
            .iter()
            .filter(|m| m.msg_type == msg_type.id())
            .cloned()
            .collect()
    }

    /// Applications currently being played.
    pub fn played(&self) -> Vec<u32> {
        self.lock().played.clone()
    }

    /// Push a notification as if the service had sent it.
    pub fn inject(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("memory transport: event receiver dropped");
        }
    }

    /// Deliver an inbound envelope.
    pub fn deliver(&self, envelope: InboundEnvelope) {
        self.inject(TransportEvent::MessageReceived(envelope));
    }

    /// Run `f` against the hosted coordinator, if any.
    pub fn with_coordinator_mut<R>(
        &self,
        f: impl FnOnce(&mut SimulatedCoordinator) -> R,
    ) -> Option<R> {
        self.lock().coordinator.as_mut().map(f)
    }
}

impl Transport for MemoryTransport {
    fn has_identity(&self) -> bool {
        self.lock().identity
    }

    fn send_to_gc(
        &self,
        app_id: u32,
        msg_type: u32,
        framing: Framing,
        payload: Bytes,
    ) -> Result<()> {
        let replies = {
            let mut inner = self.lock();
            if !inner.identity {
                return Err(GcError::NoIdentity);
            }

            if inner.sent_capacity > 0 {
                if inner.sent.len() >= inner.sent_capacity {
                    inner.sent.pop_front();
                }
                inner.sent.push_back(SentMessage {
                    app_id,
                    msg_type,
                    framing,
                    payload: payload.clone(),
                    at: Instant::now(),
                });
            }

            match inner.coordinator.as_mut() {
                Some(coordinator) if coordinator.app_id() == app_id => coordinator
                    .handle(msg_type, &payload)
                    .map_err(|e| GcError::Transport(format!("Simulated coordinator failed: {e}")))?,
                _ => Vec::new(),
            }
        };

        for reply in replies {
            self.deliver(reply);
        }
        Ok(())
    }

    fn set_played_applications(&self, app_ids: &[u32]) -> Result<()> {
        let launched: Vec<u32> = {
            let mut inner = self.lock();
            let launched = app_ids
                .iter()
                .copied()
                .filter(|id| !inner.played.contains(id))
                .collect();
            inner.played = app_ids.to_vec();
            launched
        };

        for app_id in launched {
            self.inject(TransportEvent::AppLaunched(app_id));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_played_applications_emit_launch_once() {
        let (transport, mut rx) = MemoryTransport::new();

        transport.set_played_applications(&[10]).unwrap();
        transport.set_played_applications(&[10]).unwrap();
        transport.set_played_applications(&[10, 20]).unwrap();

        assert_eq!(rx.recv().await, Some(TransportEvent::AppLaunched(10)));
        assert_eq!(rx.recv().await, Some(TransportEvent::AppLaunched(20)));
        assert!(rx.try_recv().is_err());
        assert_eq!(transport.played(), vec![10, 20]);

        transport.set_played_applications(&[]).unwrap();
        assert!(transport.played().is_empty());
    }

    #[test]
    fn test_send_without_identity() {
        let (transport, _rx) = MemoryTransport::new();
        transport.set_identity(false);

        let result = transport.send_to_gc(1, 4006, Framing::Protobuf, Bytes::new());
        assert!(matches!(result, Err(GcError::NoIdentity)));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_send_records_message() {
        let (transport, _rx) = MemoryTransport::new();

        transport
            .send_to_gc(1, 9203, Framing::Raw, Bytes::from_static(b"\x01"))
            .unwrap();

        let sent = transport.sent_of_type(GcMessageType::GetActiveMatches);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].app_id, 1);
        assert_eq!(sent[0].framing, Framing::Raw);
        assert_eq!(&sent[0].payload[..], b"\x01");
    }

    #[test]
    fn test_sent_log_is_bounded() {
        let (transport, _rx) = MemoryTransport::new();
        transport.set_sent_log_capacity(3);

        for i in 0..10u8 {
            transport
                .send_to_gc(1, 4006, Framing::Raw, Bytes::from(vec![i]))
                .unwrap();
        }

        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        let payloads: Vec<u8> = sent.iter().map(|m| m.payload[0]).collect();
        assert_eq!(payloads, vec![7, 8, 9]);

        // Shrinking drops the oldest entries immediately
        transport.set_sent_log_capacity(1);
        assert_eq!(transport.sent()[0].payload[0], 9);

        transport.set_sent_log_capacity(0);
        transport
            .send_to_gc(1, 4006, Framing::Raw, Bytes::new())
            .unwrap();
        assert!(transport.sent().is_empty());
    }
}
