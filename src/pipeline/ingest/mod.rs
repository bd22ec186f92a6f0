#[cfg(test)]
mod tests;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::chunking::{ChunkingConfig, split_with_config};
use crate::config::Config;
use crate::database::lancedb::{ChunkFilter, ChunkPayload, ChunkRecord, VectorStore};
use crate::embeddings::EmbeddingClient;
use crate::{DocativeError, Result};

/// Ingestion pipeline: chunk the source text, embed every chunk, and write
/// the batch into the shared collection under a freshly generated bot
/// identity.
///
/// At most one bot may be active per owner email. The existence check,
/// replace-delete, and write run under a per-owner lease so two concurrent
/// uploads from the same owner cannot interleave; ingestions for different
/// owners proceed fully independently.
pub struct IngestPipeline {
    store: Arc<VectorStore>,
    embeddings: Arc<EmbeddingClient>,
    chunking: ChunkingConfig,
    owner_leases: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IngestPipeline {
    #[inline]
    pub fn new(store: Arc<VectorStore>, embeddings: Arc<EmbeddingClient>, config: &Config) -> Self {
        Self {
            store,
            embeddings,
            chunking: config.chunking.clone(),
            owner_leases: Mutex::new(HashMap::new()),
        }
    }

    /// Create (or replace) the owner's bot from the given text and return
    /// the new `bot_id`.
    ///
    /// Fails with [`DocativeError::EmptyContent`] when the text is blank and
    /// with [`DocativeError::ExistingBot`] when the owner already has a bot
    /// and `replace` is false. With `replace`, the old bot is purged before
    /// the new chunks are written; a failure between those two steps leaves
    /// the owner bot-less, and the client retries ingestion from scratch.
    #[inline]
    pub async fn ingest(
        &self,
        text: &str,
        owner_email: &str,
        display_name: &str,
        replace: bool,
    ) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DocativeError::EmptyContent);
        }

        let lease = self.owner_lease(owner_email);
        let _guard = lease.lock().await;

        if let Some(existing_bot_id) = self.find_bot_for_owner(owner_email).await? {
            if !replace {
                return Err(DocativeError::ExistingBot(existing_bot_id));
            }

            warn!(
                "Replacing bot {} for owner {}",
                existing_bot_id, owner_email
            );
            self.store
                .delete_by_filter(&ChunkFilter::BotId(existing_bot_id))
                .await?;
        }

        let bot_id = Uuid::new_v4().to_string();

        let chunks = split_with_config(text, &self.chunking);
        let vectors = self.embeddings.embed_batch(&chunks).await?;

        let created_at = Utc::now().to_rfc3339();
        let records = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (content, vector))| ChunkRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    bot_id: bot_id.clone(),
                    owner_email: owner_email.to_string(),
                    display_name: display_name.to_string(),
                    content,
                    chunk_index: index as u32,
                    created_at: created_at.clone(),
                },
            })
            .collect::<Vec<_>>();

        // Connecting already bootstrapped the schema; the repeat call is
        // free and picks up scalar indexes once the collection has data.
        self.store.ensure_schema().await?;

        let chunk_count = records.len();
        self.store.upsert_chunks(records).await?;

        info!(
            "Created bot {} for {} ({} chunks)",
            bot_id, owner_email, chunk_count
        );
        Ok(bot_id)
    }

    /// The owner's current `bot_id`, if any. Existence is implied by at
    /// least one indexed chunk carrying the owner's email.
    #[inline]
    pub async fn find_bot_for_owner(&self, owner_email: &str) -> Result<Option<String>> {
        let found = self
            .store
            .find_by_filter(&ChunkFilter::OwnerEmail(owner_email.to_string()), 1)
            .await?;

        Ok(found.into_iter().next().map(|payload| payload.bot_id))
    }

    fn owner_lease(&self, owner_email: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut leases = self
            .owner_leases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(leases.entry(owner_email.to_string()).or_default())
    }
}
