use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use reviewscore::config::{ApiConfig, ScoringConfig};
use reviewscore::grouper::ListingBatch;
use reviewscore::llm::{BackendError, ChatRequest, CompletionBackend, OpenAiBackend};
use reviewscore::ratings::{Category, ScoreOutcome};
use reviewscore::reviews::Review;
use reviewscore::score_client::{RetryPolicy, ScoreClient};

/// Accept one connection, capture the raw request, answer with `status` and `body`.
async fn stub_server(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|value| value.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;

        String::from_utf8_lossy(&request).to_string()
    });

    (base_url, handle)
}

fn api_config(base_url: String) -> ApiConfig {
    ApiConfig {
        api_key: "sk-test".to_string(),
        base_url,
        timeout: Duration::from_secs(5),
        max_retries: 0,
        retry_backoff: Duration::ZERO,
    }
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_sends_json_object_request() {
    let (base_url, server) = stub_server("200 OK", completion("{\"overall_rating\": 4}")).await;
    let backend = OpenAiBackend::new(&api_config(base_url)).unwrap();

    let request = ChatRequest::json_object("test-model", "system text", "Listing ID: 9");
    let content = backend.complete(&request).await.unwrap();
    assert_eq!(content, "{\"overall_rating\": 4}");

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1/chat/completions HTTP/1.1\r\n"), "request: {}", raw);
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer sk-test"));

    let body_start = raw.find("\r\n\r\n").unwrap() + 4;
    let body: serde_json::Value = serde_json::from_str(&raw[body_start..]).unwrap();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][0]["content"], "system text");
    assert_eq!(body["messages"][1]["content"], "Listing ID: 9");
}

#[tokio::test]
async fn test_server_error_status() {
    let (base_url, server) = stub_server("500 Internal Server Error", "{\"error\":\"boom\"}".to_string()).await;
    let backend = OpenAiBackend::new(&api_config(base_url)).unwrap();

    let err = backend
        .complete(&ChatRequest::json_object("m", "s", "u"))
        .await
        .unwrap_err();
    match err {
        BackendError::Api { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_score_client_over_http() {
    let reply = r#"{"overall_rating": 4.8, "cleanliness_rating": 4.6, "communication_rating": 5,
        "location_rating": 4.9, "value_rating": 4.4, "safety_rating": 5}"#;
    let (base_url, server) = stub_server("200 OK", completion(reply)).await;
    let api = api_config(base_url);
    let backend = OpenAiBackend::new(&api).unwrap();
    let client = ScoreClient::new(Box::new(backend), ScoringConfig::default(), RetryPolicy::from(&api));

    let batch = ListingBatch {
        listing_id: 77,
        sampled_reviews: vec![Review {
            listing_id: 77,
            review_id: 1,
            date: None,
            reviewer_name: "Noor".to_string(),
            comments_clean: "Loved the balcony".to_string(),
        }],
    };

    let outcome = client.score(&batch).await;
    let ScoreOutcome::Complete(ratings) = outcome else {
        panic!("expected complete outcome, got {:?}", outcome);
    };
    assert_eq!(ratings.get(Category::Overall), Some(4.8));
    assert_eq!(ratings.get(Category::Safety), Some(5.0));

    let raw = server.await.unwrap();
    assert!(raw.contains("Listing ID: 77"));
    assert!(raw.contains("gpt-4o-mini"));
}
