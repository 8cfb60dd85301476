//! Payload codecs for the Game Coordinator protocol.
//!
//! Message bodies are opaque bytes encoded with a named protobuf schema.
//! One legacy message type wraps another message whose body has been
//! compressed with raw Snappy:
//!
//! ```text
//! type 523 payload
//! ┌─────────────────────────────────────────────┐
//! │ CgcMsgCompressedMsgToClient                 │
//! │   msg_id = 9204                             │
//! │   compressed_msg = snappy(<inner protobuf>) │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use citadel::codec::MessageCodec;
//! use citadel::protocol::CMsgConnectionStatus;
//!
//! let codec = MessageCodec::new();
//! let status: CMsgConnectionStatus = codec.decode(&payload)?;
//!
//! let envelope = codec.decode_compressed(&wrapper_payload)?;
//! let body = codec.decompress(&envelope)?;
//! ```

mod compressed;
mod message;
mod snappy;

pub use compressed::CompressedEnvelope;
pub use message::MessageCodec;
pub use snappy::{SnappyCodec, DEFAULT_MAX_DECOMPRESSED};
