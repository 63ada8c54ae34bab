use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub store_backend: StoreBackend,
    pub redis_url: Option<String>,
    pub session_ttl: Duration,
    pub allowed_origin: String,
    /// `None` disables the memory store sweeper; lazy expiry still applies.
    pub sweep_interval: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("BEACH_RELAY_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".into())
            .parse()
            .context("BEACH_RELAY_ADDR is not a socket address")?;
        let log_filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,beach_relay=debug".into());
        let store_backend = std::env::var("BEACH_RELAY_STORE")
            .map(|raw| StoreBackend::parse(&raw))
            .unwrap_or(StoreBackend::Memory);
        let redis_url = std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty());
        let session_ttl_secs = std::env::var("SESSION_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        let allowed_origin = std::env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "*".into());
        let sweep_interval_secs: u64 = std::env::var("BEACH_RELAY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            bind_addr,
            log_filter,
            store_backend,
            redis_url,
            session_ttl: Duration::from_secs(session_ttl_secs),
            allowed_origin,
            sweep_interval: (sweep_interval_secs > 0)
                .then(|| Duration::from_secs(sweep_interval_secs)),
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_filter: "info,beach_relay=debug".into(),
            store_backend: StoreBackend::Memory,
            redis_url: None,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            allowed_origin: "*".into(),
            sweep_interval: Some(Duration::from_secs(60)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl StoreBackend {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "redis" => StoreBackend::Redis,
            _ => StoreBackend::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_timeout::timeout]
    fn store_backend_parse_defaults_to_memory() {
        assert_eq!(StoreBackend::parse("redis"), StoreBackend::Redis);
        assert_eq!(StoreBackend::parse(" REDIS "), StoreBackend::Redis);
        assert_eq!(StoreBackend::parse("memory"), StoreBackend::Memory);
        assert_eq!(StoreBackend::parse("etcd"), StoreBackend::Memory);
    }

    #[test_timeout::timeout]
    fn default_matches_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.allowed_origin, "*");
        assert_eq!(cfg.store_backend, StoreBackend::Memory);
        assert_eq!(cfg.bind_addr.port(), 8080);
    }
}
