//! Game Coordinator session protocol.
//!
//! Once the transport reports the target application as launched, the
//! client establishes a logical session with that application's coordinator
//! through a hello/welcome exchange, watches connection-status updates, and
//! re-enters the handshake when the session is reported lost.
//!
//! ## Message Flow
//!
//! ```text
//! Client                              Coordinator
//!    |                                     |
//!    |  (app launched, wait 500 ms)        |
//!    |-------- HELLO (4006) -------------->|  unanswered
//!    |  (wait 1000 ms)                     |
//!    |-------- HELLO (4006) -------------->|  unanswered
//!    |  (wait 2000 ms, 4000 ms, ... 60 s)  |
//!    |-------- HELLO (4006) -------------->|
//!    |<------- WELCOME (4004) -------------|  session established
//!    |                                     |
//!    |<------- CONNECTION STATUS (4009) ---|  != HAVE_SESSION: lost, hello again
//!    |                                     |
//!    |-------- GET ACTIVE MATCHES (9203) ->|
//!    |<------- COMPRESSED (523) -----------|  inner 9204, snappy body
//! ```
//!
//! ## State Machine
//!
//! | State               | Description                        | Transitions                       |
//! |---------------------|------------------------------------|-----------------------------------|
//! | `NotLaunched`       | Application not launched           | → AwaitingHandshake (launched)    |
//! | `AwaitingHandshake` | Hello retry sequence in progress   | → Connected (welcome / status)    |
//! | `Connected`         | Coordinator session held           | → AwaitingHandshake (loss)        |
//!
//! Any state returns to `NotLaunched` when the application is stopped.
//! A pending retry exists only in `AwaitingHandshake`.
//!
//! ## Dispatch
//!
//! | Type | Handling                                                   |
//! |------|------------------------------------------------------------|
//! | 523  | unwrap, decompress, decode inner 9204 as active matches    |
//! | 4004 | welcome                                                    |
//! | 4009 | decode connection status                                   |
//! | else | ignored                                                    |
//!
//! Envelopes for other applications are dropped before dispatch.

mod backoff;
mod message;
mod proto;
mod router;
mod session;

pub use backoff::BackoffSchedule;
pub use message::{GcMessageType, InboundEnvelope};
pub use proto::{
    ActiveMatch, ActiveMatchPlayer, CMsgClientHello, CMsgClientToGcGetActiveMatches,
    CMsgClientToGcGetActiveMatchesResponse, CMsgClientWelcome, CMsgConnectionStatus,
    CgcMsgCompressedMsgToClient, GcConnectionStatus,
};
pub use router::{Dispatch, MessageRouter};
pub use session::{GcEvent, GcSession, SessionState, SessionStats};

/// Default target application (Deadlock)
pub const DEFAULT_APP_ID: u32 = 1422450;
