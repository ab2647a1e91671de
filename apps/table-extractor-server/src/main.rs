//! Table Extractor Server
//!
//! HTTP service that runs documents through external table-extraction
//! backends and writes the detected tables to disk.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use table_extractor_server::backends::{
    CloudParseBackend, PartitionApiBackend, StructureParserBackend,
};
use table_extractor_server::config::Config;
use table_extractor_server::extraction::{Orchestrator, OrchestratorConfig};
use table_extractor_server::routes;
use table_extractor_server::services::{
    DoclingServeClient, LlamaParseClient, OpenAiClient, UnstructuredClient,
};
use table_extractor_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "table_extractor_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Table Extractor Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Backend timeout: {}s, HTTP timeout: {}s",
        config.extraction.backend_timeout_secs,
        config.extraction.http_timeout_secs
    );
    warn_missing_credentials(&config);

    let orchestrator = build_orchestrator(&config)?;
    tracing::info!("Registered backends: {:?}", orchestrator.registered_backends());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;

    let app = routes::app(AppState::new(orchestrator));

    // Start server with graceful shutdown
    tracing::info!("Table Extractor Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let docling = DoclingServeClient::new(config.docling_client())
        .context("Failed to create docling-serve client")?;
    let llamaparse = LlamaParseClient::new(config.llamaparse_client())
        .context("Failed to create LlamaParse client")?;
    let openai =
        OpenAiClient::new(config.openai_client()).context("Failed to create OpenAI client")?;
    let unstructured = UnstructuredClient::new(config.unstructured_client())
        .context("Failed to create Unstructured client")?;

    Ok(Orchestrator::new(OrchestratorConfig {
        backend_timeout: config.backend_timeout(),
    })
    .with_backend(Arc::new(StructureParserBackend::new(Arc::new(docling))))
    .with_backend(Arc::new(CloudParseBackend::new(
        Arc::new(llamaparse),
        Arc::new(openai),
    )))
    .with_backend(Arc::new(PartitionApiBackend::new(Arc::new(unstructured)))))
}

/// Missing keys only fail the backend that needs them
fn warn_missing_credentials(config: &Config) {
    let keys = [
        ("LLAMAPARSE_API_KEY", config.llamaparse.api_key.is_none()),
        ("OPENAI_API_KEY", config.openai.api_key.is_none()),
        ("UNSTRUCTURED_API_KEY", config.unstructured.api_key.is_none()),
    ];
    for (name, missing) in keys {
        if missing {
            tracing::warn!("{} is not set; the backend using it will fail", name);
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
