//! Simulated Game Coordinator.
//!
//! Answers hellos with a welcome (after ignoring a configurable number of
//! them) and active-matches requests with a legacy compressed response.

use crate::codec::MessageCodec;
use crate::error::Result;
use crate::protocol::{
    ActiveMatch, CMsgClientToGcGetActiveMatchesResponse, CMsgClientWelcome, CMsgConnectionStatus,
    GcConnectionStatus, GcMessageType, InboundEnvelope,
};

/// Coordinator-side behaviour for [`MemoryTransport`](super::MemoryTransport).
#[derive(Debug, Clone)]
pub struct SimulatedCoordinator {
    app_id: u32,
    codec: MessageCodec,
    ignore_hellos: usize,
    hellos_seen: usize,
    match_requests_seen: usize,
    active_matches: Vec<ActiveMatch>,
}

impl SimulatedCoordinator {
    /// Coordinator for `app_id` that welcomes the first hello.
    pub fn new(app_id: u32) -> Self {
        Self {
            app_id,
            codec: MessageCodec::new(),
            ignore_hellos: 0,
            hellos_seen: 0,
            match_requests_seen: 0,
            active_matches: Vec::new(),
        }
    }

    /// Leave the next `count` hellos unanswered.
    #[must_use]
    pub fn ignoring_hellos(mut self, count: usize) -> Self {
        self.ignore_hellos = count;
        self
    }

    /// Matches returned for active-matches requests.
    #[must_use]
    pub fn with_active_matches(mut self, matches: Vec<ActiveMatch>) -> Self {
        self.active_matches = matches;
        self
    }

    /// Application this coordinator serves.
    pub fn app_id(&self) -> u32 {
        self.app_id
    }

    /// Hellos received so far.
    pub fn hellos_seen(&self) -> usize {
        self.hellos_seen
    }

    /// Active-matches requests received so far.
    pub fn match_requests_seen(&self) -> usize {
        self.match_requests_seen
    }

    /// Ignore the next `count` hellos from now on (e.g. after a simulated loss).
    pub fn ignore_next_hellos(&mut self, count: usize) {
        self.ignore_hellos = self.hellos_seen + count;
    }

    /// Handle one outbound client message and produce the replies.
    pub fn handle(&mut self, msg_type: u32, _payload: &[u8]) -> Result<Vec<InboundEnvelope>> {
        match GcMessageType::from_id(msg_type) {
            Some(GcMessageType::ClientHello) => {
                self.hellos_seen += 1;
                if self.hellos_seen > self.ignore_hellos {
                    Ok(vec![self.welcome()])
                } else {
                    tracing::debug!("Simulated coordinator ignoring hello {}", self.hellos_seen);
                    Ok(Vec::new())
                }
            },
            Some(GcMessageType::GetActiveMatches) => {
                self.match_requests_seen += 1;
                Ok(vec![self.active_matches_response()?])
            },
            _ => Ok(Vec::new()),
        }
    }

    /// A welcome envelope.
    pub fn welcome(&self) -> InboundEnvelope {
        let welcome = CMsgClientWelcome {
            version: 1,
            ..Default::default()
        };
        InboundEnvelope::new(
            self.app_id,
            GcMessageType::ClientWelcome,
            self.codec.encode(&welcome),
        )
    }

    /// A connection-status envelope.
    pub fn status_update(&self, status: GcConnectionStatus) -> InboundEnvelope {
        InboundEnvelope::new(
            self.app_id,
            GcMessageType::ClientConnectionStatus,
            self.codec.encode(&CMsgConnectionStatus::with_status(status)),
        )
    }

    /// The active-matches response wrapped in a legacy compressed envelope.
    pub fn active_matches_response(&self) -> Result<InboundEnvelope> {
        let response = CMsgClientToGcGetActiveMatchesResponse {
            active_matches: self.active_matches.clone(),
        };
        let body = self.codec.encode(&response);
        let wrapped = self
            .codec
            .wrap_compressed(GcMessageType::GetActiveMatchesResponse.id(), &body)?;

        Ok(InboundEnvelope::new(
            self.app_id,
            GcMessageType::CompressedMsgToClientLegacy,
            wrapped,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_then_welcomes() {
        let mut coordinator = SimulatedCoordinator::new(7).ignoring_hellos(2);
        let hello = GcMessageType::ClientHello.id();

        assert!(coordinator.handle(hello, &[]).unwrap().is_empty());
        assert!(coordinator.handle(hello, &[]).unwrap().is_empty());

        let replies = coordinator.handle(hello, &[]).unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].known_type(), Some(GcMessageType::ClientWelcome));
        assert_eq!(replies[0].app_id, 7);
        assert_eq!(coordinator.hellos_seen(), 3);
    }

    #[test]
    fn test_ignore_next_hellos_is_relative() {
        let mut coordinator = SimulatedCoordinator::new(7);
        let hello = GcMessageType::ClientHello.id();

        assert_eq!(coordinator.handle(hello, &[]).unwrap().len(), 1);
        coordinator.ignore_next_hellos(1);
        assert!(coordinator.handle(hello, &[]).unwrap().is_empty());
        assert_eq!(coordinator.handle(hello, &[]).unwrap().len(), 1);
    }

    #[test]
    fn test_matches_request_gets_compressed_reply() {
        let mut coordinator = SimulatedCoordinator::new(7);
        let replies = coordinator
            .handle(GcMessageType::GetActiveMatches.id(), &[])
            .unwrap();

        assert_eq!(replies.len(), 1);
        assert_eq!(
            replies[0].known_type(),
            Some(GcMessageType::CompressedMsgToClientLegacy)
        );
        assert_eq!(coordinator.match_requests_seen(), 1);
    }

    #[test]
    fn test_unknown_messages_get_no_reply() {
        let mut coordinator = SimulatedCoordinator::new(7);
        assert!(coordinator.handle(1234, &[1, 2, 3]).unwrap().is_empty());
    }
}
