// Scenario S5 (rate-limit retry): a provider that errors with a
// rate-limit-flavored message on the first call and succeeds on the second
// yields exactly one ~1s delay and a single successful response through the
// Orchestrator, not just the retry helper in isolation.

use std::sync::Arc;
use std::time::Instant;

use navbrain::llm::orchestrator::{Mode, Orchestrator};
use navbrain::llm::providers::LocalHttpProvider;
use navbrain::llm::ChatMessage;

#[tokio::test]
async fn orchestrator_retries_once_through_a_real_http_provider() {
    let mut server = mockito::Server::new_async().await;

    let rate_limited = server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body("rate limit exceeded, slow down")
        .expect(1)
        .create_async()
        .await;

    let succeeds = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices":[{"message":{"content":"hello"},"finish_reason":"stop"}]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let provider = Arc::new(LocalHttpProvider::new(Some(server.url()), "test-model").unwrap());
    let orchestrator = Orchestrator::new(provider, None, None);

    let start = Instant::now();
    let response = orchestrator
        .send_once(Mode::Default, vec![ChatMessage::user("hi")], None)
        .await
        .expect("orchestrator should recover after one retry");

    assert_eq!(response.content, "hello");
    assert!(start.elapsed() >= std::time::Duration::from_secs(1));

    rate_limited.assert_async().await;
    succeeds.assert_async().await;
}
