use super::*;
use serial_test::serial;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::settings::OPENAI_API_KEY_ENV;

#[test]
fn role_serialization() {
    let message = ChatMessage::system("rules");
    let json = serde_json::to_string(&message).expect("should serialize");
    assert_eq!(json, r#"{"role":"system","content":"rules"}"#);

    let parsed: ChatMessage =
        serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).expect("should parse");
    assert_eq!(parsed.role, Role::Assistant);
}

#[test]
#[serial]
fn get_llm_dispatches_on_model_name() {
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(OPENAI_API_KEY_ENV) };
    let mut config = Config::default();

    let llm = get_llm(&config, "debug", 0.0).expect("debug model needs no key");
    assert_eq!(llm.model(), "debug");

    let llm = get_llm(&config, "ollama/llama3", 0.0).expect("ollama model needs no key");
    assert_eq!(llm.model(), "llama3");

    assert!(matches!(
        get_llm(&config, "gpt-4", 0.0),
        Err(QaError::MissingApiKey)
    ));
    assert!(matches!(get_llm(&config, "  ", 0.0), Err(QaError::Llm(_))));

    config.openai.api_key = Some("sk-test".to_string());
    let llm = get_llm(&config, "gpt-3.5-turbo", 0.0).expect("openai model with key");
    assert_eq!(llm.model(), "gpt-3.5-turbo");
}

#[test]
#[serial]
fn validation_skips_local_models() {
    // SAFETY: tests touching the environment are serialized
    unsafe { std::env::remove_var(OPENAI_API_KEY_ENV) };
    let config = Config::default();

    assert!(validate_openai_key(&config, "debug").is_ok());
    assert!(validate_openai_key(&config, "ollama/mistral").is_ok());
    assert!(matches!(
        validate_openai_key(&config, "gpt-4"),
        Err(QaError::MissingApiKey)
    ));
}

#[tokio::test]
async fn key_check_against_models_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer sk-good"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("Authorization", "Bearer sk-bad"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let base_url = Url::parse(&format!("{}/v1/", server.uri())).expect("mock uri is valid");

    assert!(check_openai_key(Some("sk-good"), &base_url).is_ok());
    assert!(matches!(
        check_openai_key(Some("sk-bad"), &base_url),
        Err(QaError::InvalidApiKey(_))
    ));
    assert!(matches!(
        check_openai_key(Some("   "), &base_url),
        Err(QaError::MissingApiKey)
    ));
    assert!(matches!(
        check_openai_key(None, &base_url),
        Err(QaError::MissingApiKey)
    ));
}
