//! Legacy compressed message envelope.

use bytes::Bytes;

/// A decoded legacy compressed wrapper.
///
/// After decompression the body is re-dispatched as if it had arrived with
/// `inner_msg_id` as its message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedEnvelope {
    /// Message type of the wrapped message
    pub inner_msg_id: u32,
    /// Snappy-compressed body
    pub compressed_payload: Bytes,
}
