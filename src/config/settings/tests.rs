use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.provider, EmbeddingProvider::OpenAi);
    assert_eq!(config.llm.models, vec!["gpt-3.5-turbo", "gpt-4"]);
    assert_eq!(config.llm.default_model, "gpt-4");
    assert!(config.llm.temperature.abs() < f32::EPSILON);
    assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.openai.embedding_model, "text-embedding-ada-002");
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.embedding_model, "nomic-embed-text:latest");
    assert_eq!(config.chunking.chunk_size, 300);
    assert_eq!(config.chunking.chunk_overlap, 0);
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.retrieval.vector_store, VectorStoreKind::LanceDb);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.openai.embedding_model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.openai.base_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.llm.temperature = 2.5;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTemperature(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.retrieval.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_overlap = 300;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkOverlap(300, 300))
    ));

    let mut invalid_config = config;
    invalid_config.chunking.chunk_size = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkSize(0))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn openai_base_url_keeps_path_for_joins() {
    let config = OpenAiConfig::default();
    let base = config.api_base_url().expect("should parse base url");
    assert_eq!(base.as_str(), "https://api.openai.com/v1/");

    let endpoint = base.join("embeddings").expect("should join endpoint");
    assert_eq!(endpoint.as_str(), "https://api.openai.com/v1/embeddings");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let mut parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    parsed_config.base_dir.clone_from(&config.base_dir);
    assert_eq!(config, parsed_config);
}

#[test]
fn provider_and_store_names_in_toml() {
    let toml_str = r#"
        [embedding]
        provider = "ollama"

        [retrieval]
        vector_store = "memory"
        top_k = 3
    "#;

    let config: Config = toml::from_str(toml_str).expect("should parse toml correctly");
    assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
    assert_eq!(config.retrieval.vector_store, VectorStoreKind::Memory);
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.llm.default_model, "gpt-4");
}

#[test]
fn setter_validation() {
    let mut config = OllamaConfig::default();

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_embedding_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_embedding_model(String::new()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(2049).is_err());

    let mut llm = LlmConfig::default();
    assert!(llm.set_default_model("gpt-3.5-turbo".to_string()).is_ok());
    assert!(llm.set_default_model("  ".to_string()).is_err());
    assert!(llm.set_temperature(0.7).is_ok());
    assert!(llm.set_temperature(-0.1).is_err());

    let mut openai = OpenAiConfig::default();
    assert!(openai.set_base_url("http://localhost:8080/v1".to_string()).is_ok());
    assert!(openai.set_base_url("ftp://example.com".to_string()).is_err());
    assert_eq!(openai.base_url, "http://localhost:8080/v1");
}

#[test]
fn load_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");

    let config = Config::load_from(temp_dir.path()).expect("should load default config");

    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.database_path(), temp_dir.path().join("metadata.db"));
    assert_eq!(config.vector_database_path(), temp_dir.path().join("vectors"));
}

#[test]
fn save_and_reload() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_dir = temp_dir.path().join("nested");

    let mut config = Config {
        base_dir: config_dir.clone(),
        ..Config::default()
    };
    config.embedding.provider = EmbeddingProvider::Debug;
    config.llm.default_model = "debug".to_string();
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;
    config.save().expect("should save config");

    assert!(config_dir.join("config.toml").exists());

    let loaded = Config::load_from(&config_dir).expect("should reload config");
    assert_eq!(config, loaded);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 500\n",
    )
    .expect("should write config file");

    let result = Config::load_from(temp_dir.path());
    assert!(result.is_err());
}

#[test]
#[serial]
fn api_key_prefers_environment() {
    let mut config = Config::default();
    config.openai.api_key = Some("sk-from-file".to_string());

    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(OPENAI_API_KEY_ENV) };
    assert_eq!(config.openai_api_key().as_deref(), Some("sk-from-file"));

    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::set_var(OPENAI_API_KEY_ENV, "sk-from-env") };
    assert_eq!(config.openai_api_key().as_deref(), Some("sk-from-env"));

    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(OPENAI_API_KEY_ENV) };
    config.openai.api_key = Some("   ".to_string());
    assert_eq!(config.openai_api_key(), None);
}

#[test]
#[serial]
fn blank_environment_key_falls_back_to_file() {
    let mut config = Config::default();
    config.openai.api_key = Some("sk-from-file".to_string());

    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::set_var(OPENAI_API_KEY_ENV, "  ") };
    let key = config.openai_api_key();
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(OPENAI_API_KEY_ENV) };

    assert_eq!(key.as_deref(), Some("sk-from-file"));
}
