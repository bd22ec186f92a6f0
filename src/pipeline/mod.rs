// The core pipelines: ingestion (chunk -> embed -> index) and
// retrieval-augmented chat (retrieve -> prompt -> answer).

pub mod chat;
pub mod ingest;

pub use chat::ChatPipeline;
pub use ingest::IngestPipeline;
