use chrono::Utc;
use clap::Parser;
use pdf_qa_core::{ProviderSelection, QaCoordinator};
use pdf_qa_server::{build_router, AppState, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = ServerConfig::parse();

    let selection = ProviderSelection::from_settings(config.provider_settings());
    let provider = selection.kind();
    if !selection.has_credentials() {
        warn!(%provider, "no API key configured; uploads and questions will fail until one is set");
    }

    let providers = selection.build();
    info!(
        %provider,
        embedder = %providers.embedder.name(),
        chat = %providers.chat.name(),
        "providers selected"
    );

    let qa = QaCoordinator::from_providers(
        providers,
        config.ingestion_options(),
        config.retrieval_options(),
    )?;

    let state = Arc::new(AppState { qa, provider });
    let app = build_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        addr = %config.bind,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        top_k = config.top_k,
        "pdf-qa-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("pdf-qa-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
