// Configuration management module
// TOML settings under ~/.docqa plus the interactive setup wizard

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, EmbeddingConfig, EmbeddingProvider, LlmConfig, OllamaConfig,
    OpenAiConfig, RetrievalConfig, VectorStoreKind,
};
