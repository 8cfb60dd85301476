//! Protobuf encode/decode glue.

use bytes::Bytes;
use prost::Message;

use super::compressed::CompressedEnvelope;
use super::snappy::SnappyCodec;
use crate::error::{GcError, Result};
use crate::protocol::CgcMsgCompressedMsgToClient;

/// Encodes outbound bodies and decodes inbound payloads by schema.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    snappy: SnappyCodec,
}

impl MessageCodec {
    /// Create codec with default decompression limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec with a custom decompression limit
    pub fn with_max_decompressed(max_decompressed: usize) -> Self {
        Self {
            snappy: SnappyCodec::with_limit(max_decompressed),
        }
    }

    /// Encode `body` with its schema
    pub fn encode<M: Message>(&self, body: &M) -> Bytes {
        Bytes::from(body.encode_to_vec())
    }

    /// Decode `payload` with schema `M`
    pub fn decode<M: Message + Default>(&self, payload: &[u8]) -> Result<M> {
        M::decode(payload).map_err(|source| GcError::Decode {
            schema: schema_name::<M>(),
            source,
        })
    }

    /// Decode the legacy compressed wrapper (does not decompress)
    pub fn decode_compressed(&self, payload: &[u8]) -> Result<CompressedEnvelope> {
        let wrapper: CgcMsgCompressedMsgToClient = self.decode(payload)?;
        Ok(CompressedEnvelope {
            inner_msg_id: wrapper.msg_id,
            compressed_payload: Bytes::from(wrapper.compressed_msg),
        })
    }

    /// Decompress the wrapped body
    pub fn decompress(&self, envelope: &CompressedEnvelope) -> Result<Vec<u8>> {
        self.snappy.decompress_bytes(&envelope.compressed_payload)
    }

    /// Build a legacy compressed wrapper around an already-encoded body
    pub fn wrap_compressed(&self, inner_msg_id: u32, body: &[u8]) -> Result<Bytes> {
        let wrapper = CgcMsgCompressedMsgToClient {
            msg_id: inner_msg_id,
            compressed_msg: self.snappy.compress_bytes(body)?,
        };
        Ok(self.encode(&wrapper))
    }
}

/// Short type name of a schema, for error messages
fn schema_name<M>() -> &'static str {
    let full = std::any::type_name::<M>();
    full.rsplit("::").next().unwrap_or(full)
}
