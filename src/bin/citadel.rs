//! Citadel CLI binary.
//!
//! Game Coordinator session client.
//!
//! # Commands
//!
//! - `simulate` - Run the client against an in-process simulated coordinator
//! - `decode` - Decode a base64 GC message body to JSON

use std::path::PathBuf;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::{Parser, Subcommand};
use citadel::{
    config::LoggingConfig,
    protocol::{
        ActiveMatch, ActiveMatchPlayer, CMsgClientHello, CMsgClientToGcGetActiveMatchesResponse,
        CMsgClientWelcome, CMsgConnectionStatus,
    },
    Config, GcClient, GcConnectionStatus, GcEvent, GcMessageType, MemoryTransport,
    MessageCodec, SimulatedCoordinator, VERSION,
};
use serde_json::Value;
use tokio::time::Instant;

#[derive(Parser)]
#[command(name = "citadel")]
#[command(version = VERSION)]
#[command(about = "Citadel - Game Coordinator session client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full session against a simulated coordinator
    Simulate {
        /// Config file path (default: <config dir>/citadel/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of hellos the coordinator leaves unanswered
        #[arg(long, default_value = "0")]
        drop_hellos: usize,

        /// Stop after this many active-matches results
        #[arg(short, long, default_value = "1")]
        rounds: usize,

        /// Report the session lost after the first result
        #[arg(long)]
        lose_session: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decode a base64 message body of the given type
    Decode {
        /// Message type (523, 4004, 4006, 4009, 9204)
        #[arg(short, long)]
        msg_type: u32,

        /// Base64-encoded payload
        payload: String,

        /// Output as pretty-printed JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            drop_hellos,
            rounds,
            lose_session,
            verbose,
        } => cmd_simulate(config, drop_hellos, rounds, lose_session, verbose),

        Commands::Decode {
            msg_type,
            payload,
            pretty,
        } => cmd_decode(msg_type, &payload, pretty),
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let log_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn cmd_simulate(
    config_path: Option<PathBuf>,
    drop_hellos: usize,
    rounds: usize,
    lose_session: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = Config::load(config_path.as_deref())?;
    init_tracing(&config.logging, verbose);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_simulation(config, drop_hellos, rounds.max(1), lose_session))
}

async fn run_simulation(
    config: Config,
    drop_hellos: usize,
    rounds: usize,
    lose_session: bool,
) -> anyhow::Result<()> {
    let app_id = config.session.app_id;
    let coordinator = SimulatedCoordinator::new(app_id)
        .ignoring_hellos(drop_hellos)
        .with_active_matches(sample_matches());
    let (transport, transport_events) = MemoryTransport::with_coordinator(coordinator);
    let (mut client, mut events) =
        GcClient::start(transport.clone(), transport_events, &config.session);

    let request_delay = Duration::from_millis(config.runner.request_matches_delay_ms);

    tracing::info!("Logged on, launching app {} in {}ms", app_id, config.runner.launch_delay_ms);
    tokio::time::sleep(Duration::from_millis(config.runner.launch_delay_ms)).await;
    client.launch().await?;

    let mut next_request: Option<Instant> = None;
    let mut results = 0;
    let mut lost_once = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            },

            event = events.recv() => match event {
                Some(GcEvent::Connected) => {
                    tracing::info!("Connected to GC for app {}", app_id);
                    next_request = Some(Instant::now() + request_delay);
                },
                Some(GcEvent::SessionLost { status }) => {
                    tracing::warn!("GC session lost: {:?}", status);
                    next_request = None;
                },
                Some(GcEvent::ActiveMatches(response)) => {
                    results += 1;
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    if results >= rounds {
                        break;
                    }

                    if lose_session && !lost_once {
                        lost_once = true;
                        let status = transport
                            .with_coordinator_mut(|c| c.status_update(GcConnectionStatus::NoSession));
                        if let Some(envelope) = status {
                            transport.deliver(envelope);
                        }
                    } else {
                        next_request = Some(Instant::now() + request_delay);
                    }
                },
                None => break,
            },

            () = wait_until(next_request) => {
                next_request = None;
                if let Err(e) = client.request_active_matches().await {
                    tracing::warn!("Active matches request not sent: {}", e);
                }
            },
        }
    }

    client.quit().await?;
    let stats = client.stats();
    eprintln!();
    eprintln!("Session Statistics:");
    eprintln!("  Hellos sent:      {}", stats.hellos_sent);
    eprintln!("  Hellos not sent:  {}", stats.hellos_not_sent);
    eprintln!("  Connections:      {}", stats.connections);
    eprintln!("  Losses:           {}", stats.losses);
    client.shutdown().await;

    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn cmd_decode(msg_type: u32, payload: &str, pretty: bool) -> anyhow::Result<()> {
    let bytes = BASE64.decode(payload.trim())?;
    let value = decode_value(msg_type, &bytes)?;

    let output = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{output}");

    Ok(())
}

fn decode_value(msg_type: u32, bytes: &[u8]) -> anyhow::Result<Value> {
    let codec = MessageCodec::new();

    let value = match GcMessageType::from_id(msg_type) {
        Some(GcMessageType::CompressedMsgToClientLegacy) => {
            let envelope = codec.decode_compressed(bytes)?;
            if envelope.inner_msg_id == GcMessageType::GetActiveMatchesResponse.id() {
                let body = codec.decompress(&envelope)?;
                let response: CMsgClientToGcGetActiveMatchesResponse = codec.decode(&body)?;
                serde_json::json!({
                    "inner_msg_id": envelope.inner_msg_id,
                    "body": response,
                })
            } else {
                serde_json::json!({
                    "inner_msg_id": envelope.inner_msg_id,
                    "compressed_len": envelope.compressed_payload.len(),
                })
            }
        },
        Some(GcMessageType::ClientWelcome) => {
            serde_json::to_value(codec.decode::<CMsgClientWelcome>(bytes)?)?
        },
        Some(GcMessageType::ClientHello) => {
            serde_json::to_value(codec.decode::<CMsgClientHello>(bytes)?)?
        },
        Some(GcMessageType::ClientConnectionStatus) => {
            let status: CMsgConnectionStatus = codec.decode(bytes)?;
            serde_json::json!({
                "status": status.connection_status(),
                "queue_position": status.queue_position,
                "queue_size": status.queue_size,
                "wait_seconds": status.wait_seconds,
                "estimated_wait_seconds_remaining": status.estimated_wait_seconds_remaining,
            })
        },
        Some(GcMessageType::GetActiveMatchesResponse) => {
            serde_json::to_value(codec.decode::<CMsgClientToGcGetActiveMatchesResponse>(bytes)?)?
        },
        Some(GcMessageType::GetActiveMatches) | None => {
            anyhow::bail!("No decodable body for message type {}", msg_type)
        },
    };

    Ok(value)
}

fn sample_matches() -> Vec<ActiveMatch> {
    let start = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default();

    (0..3u32)
        .map(|i| ActiveMatch {
            start_time: start.saturating_sub(60 * (i + 1)),
            lobby_id: 9_000_000 + u64::from(i),
            match_id: 31_000_000 + u64::from(i),
            spectators: 4 * i,
            players: (0..12u32)
                .map(|slot| ActiveMatchPlayer {
                    account_id: 100_000 + i * 100 + slot,
                    team: if slot < 6 { 0 } else { 1 },
                    abandoned: false,
                    hero_id: 1 + (slot * 3 + i) % 30,
                })
                .collect(),
            open_spectator_slots: 20 - 4 * i,
        })
        .collect()
}
