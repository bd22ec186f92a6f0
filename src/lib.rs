use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocativeError>;

/// Failure taxonomy surfaced to callers. Every core failure is a distinct
/// variant; none are swallowed. `ExistingBot` is the only variant a caller
/// can recover from (resubmit with replace); the rest are terminal for the
/// request.
#[derive(Error, Debug)]
pub enum DocativeError {
    #[error("no content to ingest")]
    EmptyContent,

    #[error("owner already has a bot: {0}")]
    ExistingBot(String),

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("vector index error: {0}")]
    Index(String),

    #[error("no content found for bot_id: {0}")]
    UnknownBot(String),

    #[error("language model returned an empty answer")]
    EmptyAnswer,

    #[error("language model error: {0}")]
    Model(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod crawler;
pub mod database;
pub mod embeddings;
pub mod extractor;
pub mod llm;
pub mod mailer;
pub mod otp;
pub mod pipeline;
pub mod server;
