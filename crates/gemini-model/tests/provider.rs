use std::future::poll_fn;
use std::pin::pin;

use agent_experts_gemini_model::{GeminiConfigBuilder, GeminiProvider};
use agent_experts_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> GeminiProvider {
    let config = GeminiConfigBuilder::with_api_key("test-key")
        .with_model("gemini-test")
        .with_base_url(server.uri())
        .build();
    GeminiProvider::new(config)
}

fn simple_request() -> ModelRequest {
    ModelRequest {
        messages: vec![ModelMessage::User("Hello".to_owned())],
        tools: vec![],
    }
}

#[tokio::test]
async fn test_streams_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gemini-test",
            "stream": true,
            "stream_options": { "include_usage": true }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"there\"},\"finish_reason\":\"stop\"}]}\n\n",
                    "data: [DONE]\n\n",
                ),
                "text/event-stream",
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let resp = provider.send_request(&simple_request()).await.unwrap();
    let mut resp = pin!(resp);

    let mut text = String::new();
    let mut finish = None;
    while let Some(event) =
        poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(reason) => finish = Some(reason),
            _ => {}
        }
    }
    assert_eq!(text, "Hello there");
    assert_eq!(finish, Some(ModelFinishReason::Stop));
}

async fn error_kind_for(template: ResponseTemplate) -> ErrorKind {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(template)
        .mount(&server)
        .await;
    let provider = provider_for(&server);
    match provider.send_request(&simple_request()).await {
        Ok(_) => panic!("request should fail"),
        Err(err) => err.kind(),
    }
}

#[tokio::test]
async fn test_rate_limited() {
    let kind = error_kind_for(ResponseTemplate::new(429).set_body_string(
        r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#,
    ))
    .await;
    assert_eq!(kind, ErrorKind::RateLimitExceeded);
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let kind = error_kind_for(ResponseTemplate::new(503)).await;
    assert_eq!(kind, ErrorKind::Unavailable);
}

#[tokio::test]
async fn test_client_error_is_other() {
    let kind = error_kind_for(ResponseTemplate::new(400)).await;
    assert_eq!(kind, ErrorKind::Other);
}

#[tokio::test]
async fn test_unexpected_content_type() {
    let kind = error_kind_for(
        ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
    )
    .await;
    assert_eq!(kind, ErrorKind::Other);
}
