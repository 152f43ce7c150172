//! callroom-relay: WebSocket signaling relay for a fixed roster of callers.
//!
//! Clients join as one of the roster roles, then exchange call requests,
//! answers and hang-ups through the relay. Signal payloads (SDP, ICE) are
//! forwarded verbatim; media flows peer-to-peer and never touches the relay.

mod config;
mod connection;
mod error;
mod hub;
mod server;

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::error::RelayError;

#[derive(Parser)]
#[command(name = "callroom-relay", about = "WebSocket signaling relay for roster calls")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file).
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file).
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "callroom_relay=info,callroom_core=info".into()),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        tracing::error!(error = %e, "callroom-relay failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), RelayError> {
    let config = resolve_config(&args)?;
    let addr = config.socket_addr()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("callroom-relay listening on {}", addr);

    server::serve(listener, config).await;
    Ok(())
}

/// File config (if any), then CLI overrides, then validation.
fn resolve_config(args: &Args) -> Result<RelayConfig, RelayError> {
    let mut config = match &args.config {
        Some(path) => config::load_from_path(path)?,
        None => RelayConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    config::validate(&config)?;
    Ok(config)
}
