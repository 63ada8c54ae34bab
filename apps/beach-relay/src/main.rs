use beach_relay::cli::{self, Cli, Commands};
use beach_relay::config::AppConfig;
use beach_relay::metrics;
use beach_relay::routes;
use beach_relay::service::SignalingService;
use beach_relay::state::AppState;
use beach_relay::store;
use beach_relay::telemetry::init_tracing;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if let Some(Commands::Probe { url, command }) = args.command {
        init_tracing(&std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()));
        if let Err(e) = cli::run_probe(url, command).await {
            error!("probe failed: {e:#}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = serve(args).await {
        error!("beach-relay stopped: {e:#}");
        std::process::exit(1);
    }
}

async fn serve(args: Cli) -> anyhow::Result<()> {
    let mut cfg = AppConfig::from_env()?;
    args.serve.apply(&mut cfg);
    init_tracing(&cfg.log_filter);

    let store = store::build_store(&cfg).await?;
    let service = SignalingService::new(store, cfg.session_ttl);
    let app = routes::router(AppState::new(service), &cfg.allowed_origin);

    info!(
        addr = %cfg.bind_addr,
        store = ?cfg.store_backend,
        redis = %cfg.redis_url.as_deref().unwrap_or("unset"),
        session_ttl_secs = cfg.session_ttl.as_secs(),
        allowed_origin = %cfg.allowed_origin,
        "starting beach-relay"
    );
    metrics::BOOT_COUNTER.inc();

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
