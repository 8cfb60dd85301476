//! Protobuf wire schemas exchanged with the coordinator.
//!
//! Only the fields this client reads or writes are declared. Unknown fields
//! on inbound messages are skipped by prost, so newer coordinator builds that
//! add fields still decode.

use prost::{Enumeration, Message};
use serde::Serialize;

/// Coordinator-reported session status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum GcConnectionStatus {
    /// Client holds a live GC session.
    HaveSession = 0,
    /// Coordinator is shutting down.
    GcGoingDown = 1,
    /// No session exists.
    NoSession = 2,
    /// No session; client is queued for logon.
    NoSessionInLogonQueue = 3,
    /// Coordinator lost its connection to Steam.
    NoSteam = 4,
    /// Session suspended.
    Suspended = 5,
    /// Steam is shutting down.
    SteamGoingDown = 6,
}

impl GcConnectionStatus {
    /// Interpret a raw status value; anything unrecognised means "no session".
    pub fn from_raw(raw: i32) -> Self {
        Self::try_from(raw).unwrap_or(Self::NoSession)
    }

    /// Whether this status confirms a live session.
    pub fn has_session(self) -> bool {
        self == Self::HaveSession
    }
}

/// Outbound hello (type 4006).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct CMsgClientHello {
    /// Client build version, 0 when unknown.
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Session need hint.
    #[prost(uint32, tag = "3")]
    pub client_session_need: u32,
    /// Client language code.
    #[prost(uint32, tag = "6")]
    pub client_language: u32,
}

/// Inbound welcome (type 4004).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct CMsgClientWelcome {
    /// Coordinator version.
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Opaque game data blob.
    #[prost(bytes = "vec", tag = "2")]
    pub game_data: Vec<u8>,
}

/// Inbound connection status update (type 4009).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct CMsgConnectionStatus {
    /// Raw [`GcConnectionStatus`] value.
    #[prost(enumeration = "GcConnectionStatus", tag = "1")]
    pub status: i32,
    /// Session need echoed back by the coordinator.
    #[prost(uint32, tag = "2")]
    pub client_session_need: u32,
    /// Position in the logon queue.
    #[prost(int32, tag = "3")]
    pub queue_position: i32,
    /// Logon queue length.
    #[prost(int32, tag = "4")]
    pub queue_size: i32,
    /// Seconds already waited.
    #[prost(int32, tag = "5")]
    pub wait_seconds: i32,
    /// Estimated seconds remaining in the queue.
    #[prost(int32, tag = "6")]
    pub estimated_wait_seconds_remaining: i32,
}

impl CMsgConnectionStatus {
    /// Create a status update carrying only `status`.
    pub fn with_status(status: GcConnectionStatus) -> Self {
        Self {
            status: status as i32,
            ..Default::default()
        }
    }

    /// Typed status; unknown values map to [`GcConnectionStatus::NoSession`].
    pub fn connection_status(&self) -> GcConnectionStatus {
        GcConnectionStatus::from_raw(self.status)
    }
}

/// Legacy compressed wrapper (type 523).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct CgcMsgCompressedMsgToClient {
    /// Message type of the wrapped message.
    #[prost(uint32, tag = "1")]
    pub msg_id: u32,
    /// Snappy-compressed body of the wrapped message.
    #[prost(bytes = "vec", tag = "2")]
    pub compressed_msg: Vec<u8>,
}

/// Outbound active-matches request (type 9203).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct CMsgClientToGcGetActiveMatches {}

/// Active-matches response (inner type 9204).
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct CMsgClientToGcGetActiveMatchesResponse {
    /// Matches currently in progress.
    #[prost(message, repeated, tag = "1")]
    pub active_matches: Vec<ActiveMatch>,
}

/// One in-progress match.
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct ActiveMatch {
    /// Unix start time.
    #[prost(uint32, tag = "1")]
    pub start_time: u32,
    /// Lobby identifier.
    #[prost(uint64, tag = "2")]
    pub lobby_id: u64,
    /// Match identifier.
    #[prost(uint64, tag = "3")]
    pub match_id: u64,
    /// Current spectator count.
    #[prost(uint32, tag = "4")]
    pub spectators: u32,
    /// Participants.
    #[prost(message, repeated, tag = "5")]
    pub players: Vec<ActiveMatchPlayer>,
    /// Spectator slots still open.
    #[prost(uint32, tag = "6")]
    pub open_spectator_slots: u32,
}

/// Participant of an [`ActiveMatch`].
#[derive(Clone, PartialEq, Message, Serialize)]
pub struct ActiveMatchPlayer {
    /// Account identifier.
    #[prost(uint32, tag = "1")]
    pub account_id: u32,
    /// Team index.
    #[prost(int32, tag = "2")]
    pub team: i32,
    /// Whether the player abandoned.
    #[prost(bool, tag = "3")]
    pub abandoned: bool,
    /// Hero identifier.
    #[prost(uint32, tag = "4")]
    pub hero_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_raw() {
        assert_eq!(GcConnectionStatus::from_raw(0), GcConnectionStatus::HaveSession);
        assert_eq!(GcConnectionStatus::from_raw(5), GcConnectionStatus::Suspended);
        assert_eq!(GcConnectionStatus::from_raw(99), GcConnectionStatus::NoSession);
        assert!(GcConnectionStatus::HaveSession.has_session());
        assert!(!GcConnectionStatus::NoSteam.has_session());
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        // status = NO_SESSION (field 1), plus an unknown string field 15
        let bytes = [0x08, 0x02, 0x7a, 0x02, b'h', b'i'];
        let status = CMsgConnectionStatus::decode(&bytes[..]).unwrap();
        assert_eq!(status.connection_status(), GcConnectionStatus::NoSession);
    }

    #[test]
    fn test_empty_request_encodes_to_nothing() {
        assert!(CMsgClientToGcGetActiveMatches {}.encode_to_vec().is_empty());
    }
}
