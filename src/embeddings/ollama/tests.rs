use super::*;

#[test]
fn client_configuration() {
    let config = EmbeddingConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        batch_size: 128,
        ..EmbeddingConfig::default()
    };
    let client = OllamaEmbedder::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    assert_eq!(Embedder::batch_size(&client), 128);
}

#[test]
fn client_builder_methods() {
    let client = OllamaEmbedder::new(&EmbeddingConfig::default())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5)
        .with_backoff_unit(Duration::from_millis(10));

    assert_eq!(client.retry_attempts, 5);
    assert_eq!(client.backoff_unit, Duration::from_millis(10));
}

#[test]
fn retry_attempts_never_zero() {
    let client = OllamaEmbedder::new(&EmbeddingConfig::default())
        .expect("Failed to create client")
        .with_retry_attempts(0);

    assert_eq!(client.retry_attempts, 1);
}

#[test]
fn empty_batch_needs_no_request() {
    // Port 9 (discard) is never an Ollama server; no request must be issued
    let config = EmbeddingConfig {
        port: 9,
        ..EmbeddingConfig::default()
    };
    let client = OllamaEmbedder::new(&config).expect("Failed to create client");

    let vectors = client.embed(&[]).expect("empty input should succeed");
    assert!(vectors.is_empty());
}

#[test]
fn request_serialization() {
    let input = vec!["first".to_string(), "second".to_string()];
    let request = EmbedRequest {
        model: "all-minilm:latest",
        input: &input,
    };

    let json = serde_json::to_value(&request).expect("should serialize");
    assert_eq!(json["model"], "all-minilm:latest");
    assert_eq!(json["input"][1], "second");
}

#[test]
fn only_busy_statuses_are_retryable() {
    assert!(is_throttle_status(429));
    assert!(is_throttle_status(503));
    for status in [400, 404, 500, 502, 504] {
        assert!(!is_throttle_status(status), "status {status} should fail at once");
    }
}
