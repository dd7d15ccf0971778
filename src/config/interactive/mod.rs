#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{
    Config, ConfigError, EmbeddingProvider, LlmConfig, OllamaConfig, OpenAiConfig,
    VectorStoreKind,
};
use crate::embeddings::check_embedder;
use crate::llm::check_openai_key;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 DocQA Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Choose which service turns document chunks into vectors.");
    eprintln!();

    let providers = EmbeddingProvider::ALL;
    let provider_names: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
    let default_index = providers
        .iter()
        .position(|&p| p == config.embedding.provider)
        .unwrap_or(0);
    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(&provider_names)
        .interact()?;
    config.embedding.provider = providers[provider_index];

    eprintln!();
    eprintln!("{}", style("OpenAI Configuration").bold().yellow());
    configure_openai(&mut config.openai)?;

    if config.embedding.provider == EmbeddingProvider::Ollama {
        eprintln!();
        eprintln!("{}", style("Ollama Configuration").bold().yellow());
        eprintln!("Configure your local Ollama instance for embedding generation.");
        eprintln!();
        configure_ollama(&mut config.ollama)?;
    }

    eprintln!();
    eprintln!("{}", style("Answer Generation").bold().yellow());
    configure_llm(&mut config.llm)?;
    configure_retrieval(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());
    test_connections(&config);

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embeddings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.embedding.provider).cyan());

    eprintln!();
    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.openai.base_url).cyan());
    eprintln!(
        "  API Key: {}",
        style(mask_api_key(config.openai_api_key().as_deref())).cyan()
    );
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.openai.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Answering:").bold().yellow());
    eprintln!("  Models: {}", style(config.llm.models.join(", ")).cyan());
    eprintln!("  Default Model: {}", style(&config.llm.default_model).cyan());
    eprintln!("  Temperature: {}", style(config.llm.temperature).cyan());
    eprintln!(
        "  Chunk Size: {} tokens (overlap {})",
        style(config.chunking.chunk_size).cyan(),
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Vector Store: {}",
        style(config.retrieval.vector_store).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load_from(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

/// Shows only the last four characters of a key
fn mask_api_key(key: Option<&str>) -> String {
    match key {
        None => "(not set)".to_string(),
        Some(key) => {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 8 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{}", tail)
            }
        }
    }
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("OpenAI API base URL")
        .default(openai.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OpenAiConfig {
                base_url: input.clone(),
                ..OpenAiConfig::default()
            };
            temp_config.api_base_url()?;
            Ok(())
        })
        .interact_text()?;

    let api_key = Password::new()
        .with_prompt("OpenAI API key (leave empty to keep current or use OPENAI_API_KEY)")
        .allow_empty_password(true)
        .interact()?;

    let embedding_model: String = Input::new()
        .with_prompt("OpenAI embedding model")
        .default(openai.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    openai.set_base_url(base_url)?;
    openai.set_embedding_model(embedding_model)?;
    if !api_key.trim().is_empty() {
        openai.api_key = Some(api_key.trim().to_string());
    }

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(model)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let default_index = llm
        .models
        .iter()
        .position(|m| *m == llm.default_model)
        .unwrap_or(0);

    if !llm.models.is_empty() {
        let model_index = Select::new()
            .with_prompt("Default model")
            .default(default_index)
            .items(&llm.models)
            .interact()?;
        let model = llm.models[model_index].clone();
        llm.set_default_model(model)?;
    }

    let temperature: f32 = Input::new()
        .with_prompt("Temperature")
        .default(llm.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0 and 2")
            }
        })
        .interact_text()?;
    llm.set_temperature(temperature)?;

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;
    config.retrieval.top_k = top_k;

    let stores = VectorStoreKind::ALL;
    let store_names: Vec<&str> = stores.iter().map(|s| s.as_str()).collect();
    let default_index = stores
        .iter()
        .position(|&s| s == config.retrieval.vector_store)
        .unwrap_or(0);
    let store_index = Select::new()
        .with_prompt("Vector store")
        .default(default_index)
        .items(&store_names)
        .interact()?;
    config.retrieval.vector_store = stores[store_index];

    Ok(())
}

fn test_connections(config: &Config) {
    match config.openai.api_base_url() {
        Ok(base_url) => {
            match check_openai_key(config.openai_api_key().as_deref(), &base_url) {
                Ok(()) => eprintln!("{}", style("✓ OpenAI API key accepted!").green()),
                Err(e) => {
                    eprintln!("{}", style(format!("⚠ Warning: {}", e)).yellow());
                    eprintln!("You can continue, but answering questions will fail until this is fixed.");
                }
            }
        }
        Err(e) => eprintln!("{}", style(format!("⚠ Warning: {}", e)).yellow()),
    }

    if config.embedding.provider == EmbeddingProvider::Ollama {
        match check_embedder(config) {
            Ok(()) => eprintln!("{}", style("✓ Ollama connection successful!").green()),
            Err(e) => {
                eprintln!("{}", style(format!("⚠ Warning: {}", e)).yellow());
                eprintln!("You can continue, but make sure Ollama is running before ingesting.");
            }
        }
    }
}
