use super::*;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    std::fs::write(temp_dir.path().join("config.toml"), "not [valid toml")
        .expect("should write config file");

    let config = load_existing_config(temp_dir.path());
    assert_eq!(config.base_dir, temp_dir.path());
    assert!(!config.ollama.host.is_empty());
    assert!(config.ollama.port > 0);
    assert!(!config.llm.default_model.is_empty());
}

#[test]
fn api_key_masking() {
    assert_eq!(mask_api_key(None), "(not set)");
    assert_eq!(mask_api_key(Some("short")), "****");
    assert_eq!(mask_api_key(Some("sk-abcdefghijkl1234")), "****1234");
}
