#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Groq chat completion client against a mock HTTP server

use chatpdf::config::LlmConfig;
use chatpdf::llm::{CompletionBackend, GenerationConfig, GroqClient, LlmError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        base_url: format!("{}/openai/v1", server.uri()),
        api_key: Some("gsk_test_key".to_string()),
        retry_base_delay_ms: 10,
        ..LlmConfig::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn complete(client: GroqClient, config: GenerationConfig) -> Result<String, LlmError> {
    client.complete("What is the capital of France?", &config)
}

#[tokio::test]
async fn sends_openai_compatible_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk_test_key"))
        .and(body_partial_json(json!({
            "model": "llama3-70b-8192",
            "max_tokens": 4000,
            "messages": [{ "role": "user", "content": "What is the capital of France?" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Paris.")))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_config(&server);
    let client = GroqClient::new(&config);
    let answer = tokio::task::spawn_blocking(move || complete(client, config.generation_config()))
        .await
        .expect("task should join")
        .expect("completion should succeed");

    assert_eq!(answer, "Paris.");
}

#[tokio::test]
async fn rate_limits_are_retried_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached", "type": "tokens" }
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Paris.")))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_config(&server);
    let client = GroqClient::new(&config);
    let answer = tokio::task::spawn_blocking(move || complete(client, config.generation_config()))
        .await
        .expect("task should join")
        .expect("third attempt should succeed");

    assert_eq!(answer, "Paris.");
}

#[tokio::test]
async fn persistent_rate_limit_stops_at_retry_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let config = client_config(&server);
    let client = GroqClient::new(&config).with_max_retries(2);
    let result = tokio::task::spawn_blocking(move || complete(client, config.generation_config()))
        .await
        .expect("task should join");

    match result {
        Err(LlmError::RateLimited { attempts, message }) => {
            assert_eq!(attempts, 3);
            assert_eq!(message, "Rate limit reached");
        }
        other => panic!("expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn invalid_key_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid API Key", "type": "invalid_request_error" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_config(&server);
    let client = GroqClient::new(&config);
    let result = tokio::task::spawn_blocking(move || complete(client, config.generation_config()))
        .await
        .expect("task should join");

    assert!(matches!(
        result,
        Err(LlmError::Auth { status: 401, message }) if message == "Invalid API Key"
    ));
}

#[tokio::test]
async fn server_failure_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_config(&server);
    let client = GroqClient::new(&config);
    let result = tokio::task::spawn_blocking(move || complete(client, config.generation_config()))
        .await
        .expect("task should join");

    assert!(matches!(
        result,
        Err(LlmError::Api { status: 500, message }) if message == "internal error"
    ));
}

#[tokio::test]
async fn malformed_body_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let config = client_config(&server);
    let client = GroqClient::new(&config);
    let result = tokio::task::spawn_blocking(move || complete(client, config.generation_config()))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[test]
fn unreachable_host_is_a_network_error() {
    let config = LlmConfig {
        base_url: "http://127.0.0.1:9/openai/v1".to_string(),
        api_key: Some("gsk_test_key".to_string()),
        ..LlmConfig::default()
    };
    let generation = GenerationConfig {
        timeout: Duration::from_secs(2),
        ..config.generation_config()
    };

    let result = complete(GroqClient::new(&config), generation);

    assert!(matches!(result, Err(LlmError::Network(_))));
}
