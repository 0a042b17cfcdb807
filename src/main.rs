// ABOUTME: Entry point for the blogd binary.
// ABOUTME: Parses CLI arguments, initializes tracing, loads configuration, and starts the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use blogd_server::{AppState, BlogConfig, create_router};
use clap::Parser;

/// Small blog backend serving posts, comments, uploads and settings.
#[derive(Parser, Debug)]
#[command(name = "blogd", version, about, long_about = None)]
struct Cli {
    /// Configuration file path; a missing file means defaults
    #[arg(short, long, env = "BLOGD_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "blogd=debug,blogd_server=debug,blogd_store=debug,tower_http=debug",
                )
            }),
        )
        .init();

    let cli = Cli::parse();

    let mut config = BlogConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_env_overrides(|key| std::env::var(key).ok());
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let addr = config.server.bind_addr()?;

    if config.is_exposed_without_admin_token() {
        tracing::warn!(
            "binding {} without an admin token: privileged endpoints are open to anyone",
            addr
        );
    }

    let state = Arc::new(AppState::open(config).context("opening storage")?);
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(
        "blogd listening on {} ({} storage)",
        listener.local_addr()?,
        state.store.backend()
    );

    axum::serve(listener, app).await?;
    Ok(())
}
