#[cfg(test)]
mod tests;

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::lancedb::{ChunkFilter, VectorStore};
use crate::embeddings::EmbeddingClient;
use crate::llm::{ChatClient, ChatTurn, render_chat_prompt};
use crate::{DocativeError, Result};

/// Retrieval-augmented query pipeline: scope similarity search to one bot
/// identity, assemble the prompt from retrieved context plus windowed
/// conversation history, and ask the hosted model.
///
/// Read-only over the index. Fail-fast: any remote failure surfaces to the
/// caller; retry policy belongs to the caller.
pub struct ChatPipeline {
    store: Arc<VectorStore>,
    embeddings: Arc<EmbeddingClient>,
    chat: Arc<ChatClient>,
    top_k: usize,
}

impl ChatPipeline {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        embeddings: Arc<EmbeddingClient>,
        chat: Arc<ChatClient>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            embeddings,
            chat,
            top_k: config.retrieval.top_k_chunks,
        }
    }

    /// Answer a question against one bot's content.
    ///
    /// Fails with [`DocativeError::UnknownBot`] before any model call when
    /// the identity has no indexed chunks, and with
    /// [`DocativeError::EmptyAnswer`] when the model produces nothing after
    /// trimming.
    #[inline]
    pub async fn answer(
        &self,
        bot_id: &str,
        question: &str,
        history: &[ChatTurn],
    ) -> Result<String> {
        let filter = ChunkFilter::BotId(bot_id.to_string());

        let existing = self.store.find_by_filter(&filter, 1).await?;
        if existing.is_empty() {
            return Err(DocativeError::UnknownBot(bot_id.to_string()));
        }

        let query_vector = self.embeddings.embed(question).await?;

        let retrieved = self
            .store
            .similarity_search(&query_vector, &filter, self.top_k)
            .await?;
        debug!(
            "Retrieved {} chunks for bot {} (k = {})",
            retrieved.len(),
            bot_id,
            self.top_k
        );

        // Chunk overlap means the context may repeat a little text; that
        // redundancy is accepted rather than deduplicated.
        let context = retrieved
            .iter()
            .map(|chunk| chunk.payload.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = render_chat_prompt(&context, history, question);

        let raw_answer = self.chat.complete(&prompt).await?;
        let answer = raw_answer.trim();
        if answer.is_empty() {
            return Err(DocativeError::EmptyAnswer);
        }

        info!("Chat response generated for bot {}", bot_id);
        Ok(answer.to_string())
    }
}
