pub mod openai;

pub use openai::EmbeddingClient;
