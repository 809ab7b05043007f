//! tcpmsg demo server entry point.
//!
//! Runs the [`EchoHooks`] application: greets clients, answers pings, and
//! relays broadcasts between clients.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, apply CLI overrides
//!  └─ Server::start()     -- binds the port, accept loop on the I/O thread
//!  └─ update loop (application thread)
//!       └─ server.update(Some(--batch)) -> EchoHooks::on_message
//! ```
//!
//! The loop ends on Ctrl+C; the server is then stopped, which closes every
//! client connection.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tcpmsg_core::protocol::demo::DemoKind;
use tcpmsg_server::application::echo::EchoHooks;
use tcpmsg_server::infrastructure::storage::config::{default_config_path, load_config};
use tcpmsg_server::Server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// tcpmsg demo server.
#[derive(Debug, Parser)]
#[command(
    name = "tcpmsg-server",
    about = "Demo server that answers pings and relays broadcasts between clients",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Defaults to the platform config
    /// directory (`server.toml`).
    #[arg(long, env = "TCPMSG_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overriding the config file.
    #[arg(long, env = "TCPMSG_BIND")]
    bind: Option<String>,

    /// Port to listen on, overriding the config file.
    #[arg(long, env = "TCPMSG_PORT")]
    port: Option<u16>,

    /// Most messages dispatched per update pass.
    #[arg(long, default_value_t = 256, env = "TCPMSG_UPDATE_BATCH")]
    batch: usize,
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
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let running = install_ctrl_c_handler()?;
    let bind = format!("{}:{}", config.server.bind_address, config.server.port);

    let mut server = Server::<DemoKind, EchoHooks>::new(config, EchoHooks);
    server
        .start()
        .with_context(|| format!("failed to start server on {bind}"))?;
    info!("tcpmsg server ready.  Press Ctrl-C to exit.");

    let batch = cli.batch.max(1);
    while running.load(Ordering::Relaxed) {
        if server.update(Some(batch)) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
    }

    server.stop();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
