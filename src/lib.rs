//! # Citadel - Game Coordinator Session Client
//!
//! Establishes and keeps a logical session with a game's Game Coordinator
//! (GC) on top of an already authenticated transport, and decodes the
//! coordinator's active-matches listing.
//!
//! ## Features
//!
//! - **Hello/welcome handshake**: exponential backoff from 1 s up to 60 s
//! - **Session monitoring**: connection-status updates, re-handshake on loss
//! - **Message dispatch**: protobuf bodies, snappy-compressed legacy wrapper
//! - **Cross-app isolation**: traffic for other applications is dropped
//! - **Pluggable transport**: any [`Transport`]; an in-memory one ships for tests
//!
//! ## Overview
//!
//! ```text
//! Caller                   GcClient (driver task)               Transport
//!    |                              |                               |
//!    |------ launch() ------------->|--- set_played_applications -->|
//!    |                              |<-------- AppLaunched ---------|
//!    |                              |  (500 ms)                     |
//!    |                              |--- send_to_gc(4006 hello) --->|
//!    |                              |<-- MessageReceived(4004) -----|
//!    |<----- GcEvent::Connected ----|                               |
//!    |                              |                               |
//!    |-- request_active_matches() ->|--- send_to_gc(9203) --------->|
//!    |                              |<-- MessageReceived(523) ------|
//!    |<-- GcEvent::ActiveMatches ---|                               |
//! ```
//!
//! ### Message Types
//!
//! | ID   | Direction     | Purpose                                       |
//! |------|---------------|-----------------------------------------------|
//! | 4006 | Client→GC     | Hello, repeated until welcomed                |
//! | 4004 | GC→Client     | Welcome, session established                  |
//! | 4009 | GC→Client     | Connection status                             |
//! | 9203 | Client→GC     | Active-matches request                        |
//! | 523  | GC→Client     | Legacy compressed wrapper (inner 9204)        |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use citadel::{GcClient, GcEvent, MemoryTransport, SimulatedCoordinator, Config};
//!
//! let config = Config::default();
//! let coordinator = SimulatedCoordinator::new(config.session.app_id);
//! let (transport, transport_events) = MemoryTransport::with_coordinator(coordinator);
//!
//! let (client, mut events) = GcClient::start(transport, transport_events, &config.session);
//! client.launch().await?;
//! client.wait_for_session().await?;
//! client.request_active_matches().await?;
//!
//! if let Some(GcEvent::ActiveMatches(response)) = events.recv().await {
//!     println!("{} matches", response.active_matches.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`]: Async driver task and caller handle
//! - [`protocol`]: Session state machine, backoff, router and wire schemas
//! - [`codec`]: Protobuf and snappy encoding
//! - [`transport`]: Transport boundary and in-memory implementation
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use client::{GcClient, SessionSnapshot};
pub use codec::{MessageCodec, SnappyCodec};
pub use config::Config;
pub use error::{GcError, Result};
pub use protocol::{
    BackoffSchedule, Dispatch, GcConnectionStatus, GcEvent, GcMessageType, GcSession,
    InboundEnvelope, MessageRouter, SessionState, SessionStats, DEFAULT_APP_ID,
};
pub use transport::{Framing, MemoryTransport, SimulatedCoordinator, Transport, TransportEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
