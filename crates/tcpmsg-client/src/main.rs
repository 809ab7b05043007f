//! tcpmsg demo client entry point.
//!
//! Connects to a `tcpmsg-server`, pings it on a fixed interval, and prints
//! what comes back.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, apply CLI overrides
//!  └─ Client::connect()          -- blocks until the handshake completes
//!  └─ poll loop (application thread)
//!       ├─ every --ping-interval-ms: send Ping(timestamp)
//!       ├─ Accepted   -> announce ourselves with a Broadcast
//!       ├─ Pong       -> log the round-trip time
//!       └─ Broadcast  -> log the relaying client's id
//! ```
//!
//! The loop ends on Ctrl+C or when the server closes the connection.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tcpmsg_client::infrastructure::storage::config::{default_config_path, load_config};
use tcpmsg_client::Client;
use tcpmsg_core::protocol::demo::DemoKind;
use tcpmsg_core::{Message, ProtocolError};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// tcpmsg demo client.
#[derive(Debug, Parser)]
#[command(
    name = "tcpmsg-client",
    about = "Demo client that pings a tcpmsg server and prints relayed broadcasts",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config
    /// directory (`client.toml`).
    #[arg(long, env = "TCPMSG_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Server host, overriding the config file.
    #[arg(long, env = "TCPMSG_HOST")]
    host: Option<String>,

    /// Server port, overriding the config file.
    #[arg(long, env = "TCPMSG_PORT")]
    port: Option<u16>,

    /// Milliseconds between pings.
    #[arg(long, default_value_t = 1000, env = "TCPMSG_PING_INTERVAL_MS")]
    ping_interval_ms: u64,
}

// ── Demo messages ─────────────────────────────────────────────────────────────

fn micros_since_epoch(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// A `Ping` carrying the send time.
fn ping_message(now: SystemTime) -> Message<DemoKind> {
    let mut msg = Message::new(DemoKind::Ping);
    msg.push(micros_since_epoch(now));
    msg
}

/// Round-trip time of a `Pong`, which echoes the `Ping` payload.
fn round_trip(pong: &mut Message<DemoKind>, now: SystemTime) -> Result<Duration, ProtocolError> {
    let sent: u64 = pong.pop()?;
    Ok(Duration::from_micros(micros_since_epoch(now).saturating_sub(sent)))
}

fn handle_message(client: &Client<DemoKind>, mut msg: Message<DemoKind>) {
    match msg.kind() {
        DemoKind::Accepted => {
            info!("server accepted the connection");
            let mut hello = Message::new(DemoKind::Broadcast);
            hello.push(micros_since_epoch(SystemTime::now()));
            client.send(hello);
        }
        DemoKind::Pong => match round_trip(&mut msg, SystemTime::now()) {
            Ok(rtt) => info!("ping: {:.3} ms", rtt.as_secs_f64() * 1000.0),
            Err(e) => warn!("malformed Pong: {e}"),
        },
        DemoKind::Broadcast => match msg.pop::<u32>() {
            Ok(sender) => info!("broadcast from [{sender}] ({} bytes)", msg.len()),
            Err(e) => warn!("malformed Broadcast: {e}"),
        },
        _ => info!("received {msg}"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Spawns a thread that clears the returned flag on Ctrl+C.
fn install_ctrl_c_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || match runtime.block_on(tokio::signal::ctrl_c()) {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                flag.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        })
        .context("failed to spawn signal thread")?;
    Ok(running)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().context("no config path given")?,
    };
    let mut config = load_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(host) = cli.host {
        config.client.host = host;
    }
    if let Some(port) = cli.port {
        config.client.port = port;
    }

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let running = install_ctrl_c_handler()?;
    let host = config.client.host.clone();
    let port = config.client.port;

    let mut client = Client::<DemoKind>::new(config);
    client
        .connect(&host, port)
        .with_context(|| format!("failed to connect to {host}:{port}"))?;

    let interval = Duration::from_millis(cli.ping_interval_ms.max(1));
    let mut next_ping = Instant::now();

    while running.load(Ordering::Relaxed) {
        if !client.is_connected() {
            warn!("server closed the connection");
            break;
        }
        if Instant::now() >= next_ping {
            client.send(ping_message(SystemTime::now()));
            next_ping += interval;
        }
        while let Some(owned) = client.incoming().try_pop_front() {
            handle_message(&client, owned.message);
        }
        thread::sleep(Duration::from_millis(10));
    }

    client.disconnect();
    info!("tcpmsg client stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
