//! Transport boundary for the GC client.
//!
//! The authenticated connection to the central messaging service (login,
//! encryption, keepalive, raw routing) lives outside this crate. This module
//! defines only what the session needs from it:
//!
//! - **Operations**: [`Transport::send_to_gc`] and
//!   [`Transport::set_played_applications`], plus a read-only
//!   [`Transport::has_identity`] gate.
//! - **Notifications**: [`TransportEvent`] values pushed into an mpsc channel
//!   that the client driver owns.
//!
//! # Ownership
//!
//! ```text
//! ┌──────────────┐   Arc<T: Transport>   ┌────────────────────┐
//! │   GcClient   │──────────────────────>│ transport          │
//! │   (driver)   │<──────────────────────│ (Steam client etc.)│
//! └──────────────┘  mpsc TransportEvent  └────────────────────┘
//! ```
//!
//! The transport never holds a reference back to the session; it only owns
//! the sending half of the event channel.
//!
//! [`MemoryTransport`] is an in-process implementation that can host a
//! [`SimulatedCoordinator`], used by the tests and by `citadel simulate`.

mod coordinator;
mod memory;

pub use coordinator::SimulatedCoordinator;
pub use memory::{MemoryTransport, SentMessage, DEFAULT_SENT_LOG_CAPACITY};

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::InboundEnvelope;

/// How an outbound payload is framed by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// Payload is a protobuf body; the transport adds a protobuf header
    #[default]
    Protobuf,
    /// Payload is a pre-built binary message, forwarded without a header
    Raw,
}

impl Framing {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Protobuf => "protobuf",
            Self::Raw => "raw",
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The service reports an application as launched
    AppLaunched(u32),
    /// A message from some application's coordinator
    MessageReceived(InboundEnvelope),
}

/// Transport trait for the underlying authenticated connection.
///
/// Calls are fire-and-continue: responses arrive later as
/// [`TransportEvent`]s, never as return values.
pub trait Transport: Send + Sync {
    /// Whether the transport currently has a usable identity/endpoint.
    fn has_identity(&self) -> bool;

    /// Send a message to `app_id`'s coordinator.
    ///
    /// Fails with [`GcError::NoIdentity`](crate::GcError::NoIdentity) when
    /// there is no usable identity.
    fn send_to_gc(&self, app_id: u32, msg_type: u32, framing: Framing, payload: Bytes)
        -> Result<()>;

    /// Replace the set of applications being played.
    ///
    /// An accepted launch is reported asynchronously as
    /// [`TransportEvent::AppLaunched`]. An empty list stops playing.
    fn set_played_applications(&self, app_ids: &[u32]) -> Result<()>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}
