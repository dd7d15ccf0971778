use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Error reading {file_name}: {reason}")]
    FileRead { file_name: String, reason: String },

    #[error("Unsupported file type: {0} (expected .pdf, .docx or .txt)")]
    UnsupportedFileType(String),

    #[error("{0}")]
    InvalidFile(String),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("Please enter your OpenAI API key (set OPENAI_API_KEY or run `docqa config`)")]
    MissingApiKey,

    #[error("Invalid OpenAI API key: {0}")]
    InvalidApiKey(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod http;
pub mod library;
pub mod llm;
pub mod parsing;
pub mod qa;
pub mod ui;
