use clap::Parser;
use converse_sidecar::{build_router, AppState, Clock, HttpConverseClient, ModelAliases, SidecarConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "converse-sidecar",
    about = "Serve OpenAI-style chat completions from a Converse-style inference backend",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Model name map as JSON, e.g. '{"gpt-4o":"backend-model-id"}'
    #[arg(long)]
    model_map: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "converse_sidecar=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = SidecarConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env_overrides()?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref map) = cli.model_map {
        config.models = ModelAliases::from_json(map)?;
    }

    // Validate config eagerly; from_config resolves base URL and API key
    let backend = HttpConverseClient::from_config(&config)?;

    info!("Starting converse-sidecar v{}", env!("CARGO_PKG_VERSION"));
    info!("  Backend:  {}", config.effective_base_url()?);
    info!("  Port:     {}", config.port);
    info!("  Models:   {} mapped", config.models.len());

    let state = Arc::new(AppState {
        config: config.clone(),
        backend: Arc::new(backend),
        clock: Clock::system(),
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
