//! Inbound message dispatch.
//!
//! Routes one [`InboundEnvelope`] at a time to the session or to the caller.
//! Exactly one handler runs per envelope; unknown message types and unknown
//! inner IDs of the legacy compressed wrapper are ignored.

use tokio::time::Instant;

use super::message::{GcMessageType, InboundEnvelope};
use super::proto::{CMsgClientToGcGetActiveMatchesResponse, CMsgConnectionStatus, GcConnectionStatus};
use super::session::{GcEvent, GcSession};
use crate::error::Result;
use crate::transport::Transport;

/// What dispatching an envelope did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Envelope belonged to another application and was dropped
    ForeignApp,
    /// Welcome handled
    Welcome,
    /// Connection status handled
    ConnectionStatus(GcConnectionStatus),
    /// Active-matches response emitted (number of matches)
    ActiveMatches(usize),
    /// Compressed wrapper with an inner message we don't handle
    IgnoredInner(u32),
    /// Message type we don't handle
    Ignored(u32),
}

/// Dispatches inbound envelopes for one session.
#[derive(Debug, Clone, Default)]
pub struct MessageRouter;

impl MessageRouter {
    /// Create a router
    pub fn new() -> Self {
        Self
    }

    /// Dispatch one envelope.
    ///
    /// Decode errors are returned for this envelope only; session state is
    /// left untouched.
    pub fn dispatch<T: Transport + ?Sized>(
        &self,
        envelope: &InboundEnvelope,
        session: &mut GcSession<T>,
        now: Instant,
    ) -> Result<Dispatch> {
        if envelope.app_id != session.app_id() {
            return Ok(Dispatch::ForeignApp);
        }

        match envelope.known_type() {
            Some(GcMessageType::CompressedMsgToClientLegacy) => {
                self.on_compressed(&envelope.payload, session)
            },
            Some(GcMessageType::ClientWelcome) => {
                session.on_welcome();
                Ok(Dispatch::Welcome)
            },
            Some(GcMessageType::ClientConnectionStatus) => {
                let decoded: CMsgConnectionStatus = session.codec().decode(&envelope.payload)?;
                let status = decoded.connection_status();
                session.on_connection_status(status, now);
                Ok(Dispatch::ConnectionStatus(status))
            },
            _ => {
                tracing::trace!("Unhandled GC message type {}", envelope.msg_type);
                Ok(Dispatch::Ignored(envelope.msg_type))
            },
        }
    }

    fn on_compressed<T: Transport + ?Sized>(
        &self,
        payload: &[u8],
        session: &GcSession<T>,
    ) -> Result<Dispatch> {
        let codec = session.codec();
        let envelope = codec.decode_compressed(payload)?;

        match GcMessageType::from_id(envelope.inner_msg_id) {
            Some(GcMessageType::GetActiveMatchesResponse) => {
                let body = codec.decompress(&envelope)?;
                let response: CMsgClientToGcGetActiveMatchesResponse = codec.decode(&body)?;
                let count = response.active_matches.len();

                tracing::debug!("Received {} active matches", count);
                session.emit(GcEvent::ActiveMatches(response));
                Ok(Dispatch::ActiveMatches(count))
            },
            _ => {
                tracing::trace!(
                    "Unhandled compressed inner message {}",
                    envelope.inner_msg_id
                );
                Ok(Dispatch::IgnoredInner(envelope.inner_msg_id))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::codec::MessageCodec;
    use crate::config::SessionConfig;
    use crate::error::GcError;
    use crate::protocol::{ActiveMatch, ActiveMatchPlayer, SessionState};
    use crate::transport::MemoryTransport;

    const APP: u32 = 1422450;

    struct Fixture {
        router: MessageRouter,
        session: GcSession<MemoryTransport>,
        events: mpsc::UnboundedReceiver<GcEvent>,
        codec: MessageCodec,
    }

    impl Fixture {
        fn new() -> Self {
            let (transport, _rx) = MemoryTransport::new();
            let (tx, events) = mpsc::unbounded_channel();
            Self {
                router: MessageRouter::new(),
                session: GcSession::new(&SessionConfig::default(), transport, tx),
                events,
                codec: MessageCodec::new(),
            }
        }

        fn dispatch(&mut self, envelope: &InboundEnvelope) -> Result<Dispatch> {
            self.router
                .dispatch(envelope, &mut self.session, Instant::now())
        }

        fn events(&mut self) -> Vec<GcEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                events.push(event);
            }
            events
        }

        fn compressed(&self, inner_msg_id: u32, body: &[u8]) -> InboundEnvelope {
            InboundEnvelope::new(
                APP,
                GcMessageType::CompressedMsgToClientLegacy,
                self.codec.wrap_compressed(inner_msg_id, body).unwrap(),
            )
        }
    }

    fn sample_response() -> CMsgClientToGcGetActiveMatchesResponse {
        CMsgClientToGcGetActiveMatchesResponse {
            active_matches: vec![ActiveMatch {
                start_time: 1_700_000_000,
                lobby_id: 42,
                match_id: 31_000_123,
                spectators: 3,
                players: vec![ActiveMatchPlayer {
                    account_id: 1001,
                    team: 1,
                    abandoned: false,
                    hero_id: 7,
                }],
                open_spectator_slots: 12,
            }],
        }
    }

    #[test]
    fn test_welcome_routes_to_session() {
        let mut fx = Fixture::new();
        fx.session.on_application_launched(APP, Instant::now());
        let outcome = fx
            .dispatch(&InboundEnvelope::new(APP, GcMessageType::ClientWelcome, Bytes::new()))
            .unwrap();

        assert_eq!(outcome, Dispatch::Welcome);
        assert!(fx.session.has_session());
        assert_eq!(fx.events(), vec![GcEvent::Connected]);
    }

    #[test]
    fn test_foreign_app_is_dropped() {
        let mut fx = Fixture::new();
        fx.session.on_application_launched(APP, Instant::now());
        let deadline = fx.session.next_deadline();

        for msg_type in [523u32, 4004, 4009] {
            let outcome = fx
                .dispatch(&InboundEnvelope::new(730, msg_type, vec![0xffu8, 0xff]))
                .unwrap();
            assert_eq!(outcome, Dispatch::ForeignApp);
        }

        assert_eq!(fx.session.state(), SessionState::AwaitingHandshake);
        assert_eq!(fx.session.next_deadline(), deadline);
        assert!(fx.events().is_empty());
    }

    #[test]
    fn test_connection_status_decoded() {
        let mut fx = Fixture::new();
        fx.session.on_application_launched(APP, Instant::now());
        fx.session.on_welcome();
        fx.events();

        let payload = fx
            .codec
            .encode(&CMsgConnectionStatus::with_status(GcConnectionStatus::NoSteam));
        let outcome = fx
            .dispatch(&InboundEnvelope::new(
                APP,
                GcMessageType::ClientConnectionStatus,
                payload,
            ))
            .unwrap();

        assert_eq!(outcome, Dispatch::ConnectionStatus(GcConnectionStatus::NoSteam));
        assert!(!fx.session.has_session());
        assert!(fx.session.retry_pending());
    }

    #[test]
    fn test_compressed_active_matches_roundtrip() {
        let mut fx = Fixture::new();
        let response = sample_response();
        let body = fx.codec.encode(&response);
        let envelope = fx.compressed(9204, &body);

        let outcome = fx.dispatch(&envelope).unwrap();
        assert_eq!(outcome, Dispatch::ActiveMatches(1));
        assert_eq!(fx.events(), vec![GcEvent::ActiveMatches(response)]);
    }

    #[test]
    fn test_compressed_does_not_fall_through_to_welcome() {
        let mut fx = Fixture::new();
        fx.session.on_application_launched(APP, Instant::now());
        let body = fx.codec.encode(&sample_response());
        let envelope = fx.compressed(9204, &body);

        fx.dispatch(&envelope).unwrap();

        assert!(!fx.session.has_session());
        assert!(fx.session.retry_pending());
        assert_eq!(fx.session.stats().connections, 0);
        let events = fx.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], GcEvent::ActiveMatches(_)));
    }

    #[test]
    fn test_unknown_inner_id_ignored() {
        let mut fx = Fixture::new();
        let envelope = fx.compressed(7777, b"whatever");

        assert_eq!(fx.dispatch(&envelope).unwrap(), Dispatch::IgnoredInner(7777));
        assert!(fx.events().is_empty());
        assert!(!fx.session.has_session());
    }

    #[test]
    fn test_unknown_type_ignored() {
        let mut fx = Fixture::new();
        let outcome = fx
            .dispatch(&InboundEnvelope::new(APP, 4005u32, vec![1u8, 2, 3]))
            .unwrap();

        assert_eq!(outcome, Dispatch::Ignored(4005));
        // Outbound-only types are not handled either
        let outcome = fx
            .dispatch(&InboundEnvelope::new(APP, GcMessageType::ClientHello, Bytes::new()))
            .unwrap();
        assert_eq!(outcome, Dispatch::Ignored(4006));
        assert!(fx.events().is_empty());
    }

    #[test]
    fn test_malformed_status_leaves_session_alone() {
        let mut fx = Fixture::new();
        fx.session.on_application_launched(APP, Instant::now());
        fx.session.on_welcome();
        fx.events();

        let result = fx.dispatch(&InboundEnvelope::new(
            APP,
            GcMessageType::ClientConnectionStatus,
            vec![0x08u8, 0xff],
        ));

        assert!(matches!(result, Err(GcError::Decode { .. })));
        assert!(fx.session.has_session());
        assert!(!fx.session.retry_pending());
        assert!(fx.events().is_empty());
    }

    #[test]
    fn test_corrupt_compressed_body_is_an_error() {
        let mut fx = Fixture::new();
        let wrapper = crate::protocol::CgcMsgCompressedMsgToClient {
            msg_id: 9204,
            compressed_msg: vec![0x7f, 0xf0, 0x01],
        };
        let envelope = InboundEnvelope::new(
            APP,
            GcMessageType::CompressedMsgToClientLegacy,
            fx.codec.encode(&wrapper),
        );

        assert!(matches!(
            fx.dispatch(&envelope),
            Err(GcError::Decompression(_))
        ));
        assert!(fx.events().is_empty());
    }
}
