use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::embeddings::EmbeddingClient;
use crate::llm::ChatClient;
use crate::mailer::Mailer;
use crate::otp::OtpGate;
use crate::pipeline::{ChatPipeline, IngestPipeline};
use crate::server::{self, AppState};
use crate::{DocativeError, Result};

/// Wire up storage, remote clients, and pipelines into the shared
/// application state.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let api_key = config
        .openai_api_key()
        .map_err(|e| DocativeError::Config(e.to_string()))?;

    let store = Arc::new(VectorStore::connect(config).await?);
    let embeddings = Arc::new(EmbeddingClient::new(config, api_key.clone())?);
    let chat_client = Arc::new(ChatClient::new(config, api_key)?);

    let db = Database::initialize_from_config(config)
        .await
        .map_err(|e| DocativeError::Storage(e.to_string()))?;

    let ingest = IngestPipeline::new(Arc::clone(&store), Arc::clone(&embeddings), config);
    let chat = ChatPipeline::new(store, embeddings, chat_client, config);

    Ok(Arc::new(AppState {
        ingest,
        chat,
        otp: OtpGate::new(db.clone()),
        mailer: Mailer::new(config)?,
        db,
    }))
}

/// Run the HTTP API until the process is terminated
pub async fn serve(config: Config) -> Result<()> {
    let state = build_state(&config).await?;
    server::run_server(&config, state).await
}

/// Out-of-band maintenance action: create the shared collection, its scalar
/// indexes, and the SQLite tables. Connecting already bootstraps lazily;
/// this exists so operators can run the setup ahead of the first upload.
pub async fn setup(config: &Config) -> Result<()> {
    info!("Running collection and schema setup");

    let store = VectorStore::connect(config).await?;
    store.ensure_schema().await?;

    Database::initialize_from_config(config)
        .await
        .map_err(|e| DocativeError::Storage(e.to_string()))?;

    println!(
        "Collection '{}' is ready ({} dimensions, cosine distance)",
        config.collection.name, config.openai.embedding_dimension
    );
    Ok(())
}

/// Print index and log counts
pub async fn show_status(config: &Config) -> Result<()> {
    let store = VectorStore::connect(config).await?;
    let db = Database::initialize_from_config(config)
        .await
        .map_err(|e| DocativeError::Storage(e.to_string()))?;

    let chunk_count = store.count_chunks().await?;
    let upload_count = db
        .count_uploads()
        .await
        .map_err(|e| DocativeError::Storage(e.to_string()))?;

    println!("Collection '{}'", config.collection.name);
    println!("  indexed chunks: {}", chunk_count);
    println!("  recorded uploads: {}", upload_count);
    Ok(())
}
