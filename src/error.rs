//! Game Coordinator client error types.
//!
//! No error in this crate is fatal to a running session. Decode and
//! decompression failures are local to the envelope being dispatched, and
//! [`GcError::NoIdentity`] is the "not sent" signal for outbound messages:
//! the caller (or the scheduled hello retry) tries again later.

use thiserror::Error;

/// Game Coordinator client errors.
#[derive(Error, Debug)]
pub enum GcError {
    /// The transport has no usable identity/endpoint, so nothing was sent.
    #[error("Not sent: transport has no usable identity")]
    NoIdentity,

    /// A payload could not be decoded with the expected schema.
    #[error("Failed to decode {schema}: {source}")]
    Decode {
        /// Name of the schema the payload was decoded with.
        schema: &'static str,
        /// Underlying protobuf decode error.
        #[source]
        source: prost::DecodeError,
    },

    /// Legacy compressed payload could not be decompressed.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Declared decompressed size exceeds the configured limit.
    #[error("Decompressed payload too large: {declared} bytes (limit {limit})")]
    PayloadTooLarge {
        /// Size declared by the compressed stream.
        declared: usize,
        /// Configured upper bound.
        limit: usize,
    },

    /// Transport collaborator rejected an operation.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The client driver task has stopped.
    #[error("Client closed")]
    ClientClosed,

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias for GC client operations
pub type Result<T> = std::result::Result<T, GcError>;

impl GcError {
    /// Whether this error only means "not sent right now".
    pub fn is_not_sent(&self) -> bool {
        matches!(self, GcError::NoIdentity)
    }
}

impl From<toml::de::Error> for GcError {
    fn from(err: toml::de::Error) -> Self {
        GcError::Config(err.to_string())
    }
}

impl From<snap::Error> for GcError {
    fn from(err: snap::Error) -> Self {
        GcError::Decompression(err.to_string())
    }
}
