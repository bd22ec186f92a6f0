pub mod vector_store;

pub use vector_store::{ChunkFilter, ScoredChunk, VectorStore};

use serde::{Deserialize, Serialize};

/// A chunk point stored in the shared collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique point identifier
    pub id: String,
    /// Embedding vector; dimensionality must match the collection schema
    pub vector: Vec<f32>,
    /// Identity metadata and text carried with the point
    pub payload: ChunkPayload,
}

/// Metadata stored alongside each vector. A bot has no standalone record:
/// its existence is implied by at least one payload carrying its `bot_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkPayload {
    pub bot_id: String,
    pub owner_email: String,
    pub display_name: String,
    /// The chunk text itself
    pub content: String,
    /// Position of this chunk within the source document
    pub chunk_index: u32,
    pub created_at: String,
}
