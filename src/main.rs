//! VR Stream Relay
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 STREAM RELAY                 │
//!   VR player            │                                              │
//!   ─── GET /link ───────┼─▶ access guard ─▶ token mint ─▶ signed URL   │
//!                        │                                              │
//!   ─── GET /proxy ──────┼─▶ id check ─▶ token verify ─▶ origin client ─┼──▶ media server
//!   ◀── 200/206 stream ──┼── header copy ◀── chunked relay ◀────────────┼─── (localhost)
//!                        │                                              │
//!                        │  config (TOML, hot reload) · tracing · metrics│
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use vr_stream_relay::config::{load_config, ConfigWatcher, RelayConfig};
use vr_stream_relay::http::HttpServer;
use vr_stream_relay::lifecycle::{signals, Shutdown};
use vr_stream_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "vr-stream-relay")]
#[command(about = "Signed-URL streaming relay for VR players", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!("vr-stream-relay v{} starting", env!("CARGO_PKG_VERSION"));
    if args.config.is_none() {
        tracing::warn!("No configuration file given; using defaults with a random signing secret");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.base_url(),
        ip_restriction = config.ip_restriction.enabled,
        chunk_size = config.relay.chunk_size_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
