//! Message identifiers and the inbound envelope.

use bytes::Bytes;
use serde::Serialize;

/// GC message types this client knows about.
///
/// The numeric values are wire identifiers and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum GcMessageType {
    /// `k_EMsgGCCompressedMsgToClient_Legacy` (inbound wrapper)
    CompressedMsgToClientLegacy = 523,
    /// `k_EMsgGCClientWelcome` (inbound)
    ClientWelcome = 4004,
    /// `k_EMsgGCClientHello` (outbound)
    ClientHello = 4006,
    /// `k_EMsgGCClientConnectionStatus` (inbound)
    ClientConnectionStatus = 4009,
    /// `k_EMsgClientToGCGetActiveMatches` (outbound)
    GetActiveMatches = 9203,
    /// `k_EMsgClientToGCGetActiveMatchesResponse` (inner, after decompression)
    GetActiveMatchesResponse = 9204,
}

impl GcMessageType {
    /// Wire identifier
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Look up a known message type by wire identifier
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            523 => Some(Self::CompressedMsgToClientLegacy),
            4004 => Some(Self::ClientWelcome),
            4006 => Some(Self::ClientHello),
            4009 => Some(Self::ClientConnectionStatus),
            9203 => Some(Self::GetActiveMatches),
            9204 => Some(Self::GetActiveMatchesResponse),
            _ => None,
        }
    }
}

impl From<GcMessageType> for u32 {
    fn from(msg_type: GcMessageType) -> Self {
        msg_type.id()
    }
}

impl std::fmt::Display for GcMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

/// One message received from the coordinator.
///
/// Produced by the transport, consumed once by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    /// Application the message belongs to
    pub app_id: u32,
    /// Raw message type (may be unknown to this client)
    pub msg_type: u32,
    /// Opaque payload
    pub payload: Bytes,
}

impl InboundEnvelope {
    /// Create a new envelope
    pub fn new(app_id: u32, msg_type: impl Into<u32>, payload: impl Into<Bytes>) -> Self {
        Self {
            app_id,
            msg_type: msg_type.into(),
            payload: payload.into(),
        }
    }

    /// Known message type, if any
    pub fn known_type(&self) -> Option<GcMessageType> {
        GcMessageType::from_id(self.msg_type)
    }
}
