use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Structure parse error: {0}")]
    ParseStructure(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Transient embedding error: {0}")]
    EmbeddingTransient(String),
    #[error("Index write error: {0}")]
    IndexWrite(String),
    #[error("Graph write error: {0}")]
    GraphWrite(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}
