//! Knowledge graph memory MCP server on stdio.

use mem_api::{config::Config, server};
use mem_graph::KnowledgeGraphManager;
use mem_store::{FileStore, LocalFileStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let store = LocalFileStore::new();
    if let Some(parent) = config.memory_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            store.ensure_directory_exists(parent).await?;
        }
    }

    let manager = KnowledgeGraphManager::new(config.memory_file_path.clone(), store)
        .with_cache_ttl(config.cache_ttl);
    tracing::info!(
        path = %config.memory_file_path.display(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "knowledge graph MCP server running on stdio"
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    server::serve(&manager, stdin, tokio::io::stdout()).await?;
    Ok(())
}
