use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to ingest {file}: {message}")]
    Ingestion { file: String, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("No PDF documents with extractable text were found")]
    NoDocuments,

    #[error("No documents have been indexed yet")]
    NotIndexed,

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod conversation;
pub mod embeddings;
pub mod index;
pub mod ingestion;
pub mod llm;
pub mod session;
pub mod storage;
