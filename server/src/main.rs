use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use server::config::ServerConfig;
use server::{build_router, AppState, START_TIME};
use synth_core::{EngineRegistry, SynthEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    info!("Starting speech synthesis server...");

    // Load configuration from environment
    let config = ServerConfig::from_env();
    let synth_config = config.synth_config();
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, sample_rate={}Hz",
        config.port, config.rate_limit_per_minute, synth_config.sample_rate
    );

    let mut registry = EngineRegistry::new("en");
    registry.insert("en", SynthEngine::new(synth_config));
    info!("Registered {} synthesis voice(s)", registry.list_languages().len());

    // Initialize start time for uptime calculation
    let _ = START_TIME.get_or_init(std::time::Instant::now);

    let state = AppState::new(registry, config.clone());
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
