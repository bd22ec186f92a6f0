
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{DocativeError, Result};

/// Client for an OpenAI-compatible embeddings endpoint.
///
/// A batch either fully succeeds or fails as a unit; partial results from
/// the provider (missing or reordered rows) are surfaced as
/// [`DocativeError::Embedding`], never silently patched up. The pipeline
/// performs no retries; transient-error policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    api_base: Url,
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &Config, api_key: String) -> Result<Self> {
        let api_base = Url::parse(&config.openai.api_base)
            .map_err(|e| DocativeError::Config(format!("invalid API base URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai.timeout_seconds))
            .build()
            .map_err(|e| DocativeError::Embedding(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base,
            api_key,
            model: config.openai.embedding_model.clone(),
            dimension: config.openai.embedding_dimension as usize,
            client,
        })
    }

    /// Override the endpoint base, mainly for pointing tests at a mock server.
    #[inline]
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = api_base;
        self
    }

    /// Expected dimensionality of every vector this client produces
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single text
    #[inline]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| DocativeError::Embedding("provider returned no embedding".to_string()))
    }

    /// Embed a batch of texts, returning one vector per input in input order.
    #[inline]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Embedding batch of {} texts with {}", texts.len(), self.model);

        let url = self
            .api_base
            .join("/v1/embeddings")
            .map_err(|e| DocativeError::Embedding(format!("failed to build URL: {}", e)))?;

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocativeError::Embedding(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocativeError::Embedding(format!(
                "provider returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| DocativeError::Embedding(format!("invalid response body: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(DocativeError::Embedding(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        // The API is free to reorder rows; `index` ties each one back to its
        // input position.
        let mut rows = parsed.data;
        rows.sort_by_key(|row| row.index);

        let mut vectors = Vec::with_capacity(rows.len());
        for (position, row) in rows.into_iter().enumerate() {
            if row.index != position {
                return Err(DocativeError::Embedding(format!(
                    "provider response is missing index {}",
                    position
                )));
            }
            if row.embedding.len() != self.dimension {
                return Err(DocativeError::Embedding(format!(
                    "expected {}-dimensional vectors, got {}",
                    self.dimension,
                    row.embedding.len()
                )));
            }
            vectors.push(row.embedding);
        }

        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }
}
