use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragstream::config::ServerConfig;
use ragstream::llm::EnvProviderRegistry;
use ragstream::memory::{ConversationMemory, MiniLmEmbedder, SqliteVectorStore};
use ragstream::orchestrator::ResponseOrchestrator;
use ragstream::routes::configure_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let embedder = MiniLmEmbedder::new(config.embedding_cache_dir.clone())
        .context("failed to load embedding model")?;
    let store = SqliteVectorStore::open(
        &config.vector_db_path,
        &config.vector_collection,
        Arc::new(embedder),
    )
    .with_context(|| {
        format!(
            "failed to open vector store at {}",
            config.vector_db_path.display()
        )
    })?;
    info!(
        path = %config.vector_db_path.display(),
        collection = %config.vector_collection,
        policy = ?config.memory_policy,
        "Vector store ready"
    );

    let memory = Arc::new(ConversationMemory::new(Arc::new(store), config.memory_policy));
    let registry = Arc::new(EnvProviderRegistry::new(config.providers.clone()));
    let orchestrator = ResponseOrchestrator::new(memory, registry)
        .with_generation(config.generation.clone())
        .with_context_results(config.context_results);

    let routes = configure_routes(orchestrator);

    let addr = config.socket_addr();
    info!(%addr, "Starting server");
    warp::serve(routes).run(addr).await;

    Ok(())
}
