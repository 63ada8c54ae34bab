use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

use crate::config::{AppConfig, StoreBackend};

#[derive(Parser, Debug)]
#[command(name = "beach-relay")]
#[command(about = "Beach Relay WebRTC signaling relay and probe client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub serve: ServeArgs,
}

/// Server overrides; anything left unset keeps its environment value.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind, e.g. 127.0.0.1:8080
    #[arg(long)]
    pub addr: Option<SocketAddr>,

    /// Storage backend for room state
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Redis URL, required with --store redis
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Lifetime in seconds of every room-scoped key
    #[arg(long)]
    pub session_ttl: Option<u64>,

    /// CORS allowed origin ("*" for any)
    #[arg(long)]
    pub allowed_origin: Option<String>,
}

impl ServeArgs {
    pub fn apply(self, cfg: &mut AppConfig) {
        if let Some(addr) = self.addr {
            cfg.bind_addr = addr;
        }
        if let Some(store) = self.store {
            cfg.store_backend = store;
        }
        if let Some(url) = self.redis_url {
            cfg.redis_url = Some(url);
        }
        if let Some(secs) = self.session_ttl.filter(|secs| *secs > 0) {
            cfg.session_ttl = Duration::from_secs(secs);
        }
        if let Some(origin) = self.allowed_origin {
            cfg.allowed_origin = origin;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Talk to a running relay
    Probe {
        /// Relay base URL (e.g., http://localhost:8080 or https://host/api)
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[command(subcommand)]
        command: ProbeCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProbeCommands {
    /// Create a room and print its id
    Create,

    /// Print whether a room exists and has an offer/answer
    Status {
        /// Room id returned by `create`
        id: String,
    },
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_probe(url: String, command: ProbeCommands) -> Result<()> {
    let base = url.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();
    let request = match &command {
        ProbeCommands::Create => client.post(format!("{base}/room")),
        ProbeCommands::Status { id } => client
            .get(format!("{base}/room"))
            .query(&[("id", id.as_str())]),
    };
    debug!(?command, %base, "probing relay");

    let response = timeout(PROBE_TIMEOUT, request.send())
        .await
        .context("relay did not answer in time")?
        .with_context(|| format!("request to {base} failed"))?;
    let status = response.status();
    let body: Value = response.json().await.context("relay sent a non-json body")?;
    if !status.is_success() {
        bail!("relay answered {status}: {body}");
    }

    match command {
        ProbeCommands::Create => {
            let room_id = body
                .get("roomId")
                .and_then(Value::as_str)
                .context("response has no roomId")?;
            println!("{room_id}");
        }
        ProbeCommands::Status { .. } => println!("{}", serde_json::to_string_pretty(&body)?),
    }
    Ok(())
}
