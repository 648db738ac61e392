//! CreatorLens — creator content aggregation and grounded chat server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod progress;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CREATORLENS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = creatorlens_core::CreatorLensConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = Arc::new(
        creatorlens_store::SqliteStore::open(&config.data_paths.db)
            .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?,
    );

    // The embedder key comes from the same config file the chat provider
    // uses; without one, retrieval degrades to keyword-only.
    let llm_config = creatorlens_llm::LlmConfig::load(&config.data_paths.llm_config_file);
    let embedder = Arc::new(creatorlens_vector::OpenAiEmbedder::new(
        llm_config.openai_api_key.clone().unwrap_or_default(),
        "text-embedding-3-small",
    ));
    let vectors = Arc::new(
        creatorlens_vector::VectorStore::new(&config.data_paths.vectors, embedder)
            .map_err(|e| anyhow::anyhow!("Failed to open vector store: {}", e))?,
    );

    // Scrapers register here; none ship in-tree, so scrape requests no-op
    // per platform until an adapter is wired in.
    let sources: Vec<Arc<dyn creatorlens_core::ContentSource>> = Vec::new();

    let state = Arc::new(AppState::new(config, store, vectors, sources));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("CreatorLens server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
