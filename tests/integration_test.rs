use async_trait::async_trait;
use converse_sidecar::backend::{ConverseBackend, ConverseEventStream};
use converse_sidecar::config::{BackendConfig, ModelAliases, SidecarConfig};
use converse_sidecar::error::{Result, SidecarError};
use converse_sidecar::translate::converse_types::{
    ContentBlock, ContentDelta, ConverseOutput, ConverseOutputKind, ConverseRequest,
    ConverseStreamEvent, OutputMessage,
};
use converse_sidecar::{build_router, AppState, Clock};
use std::sync::{Arc, Mutex};

/// Canned backend: returns a fixed output / event sequence and records the
/// last translated request it was handed.
struct MockBackend {
    output: ConverseOutput,
    events: Vec<ConverseStreamEvent>,
    fail: bool,
    last_request: Mutex<Option<ConverseRequest>>,
}

impl MockBackend {
    fn with_text(text: &str, stop_reason: &str) -> Self {
        Self {
            output: ConverseOutput {
                output: Some(ConverseOutputKind::Message {
                    message: OutputMessage {
                        role: "assistant".to_string(),
                        content: vec![ContentBlock::Text {
                            text: text.to_string(),
                        }],
                    },
                }),
                stop_reason: stop_reason.to_string(),
            },
            events: Vec::new(),
            fail: false,
            last_request: Mutex::new(None),
        }
    }

    fn with_events(events: Vec<ConverseStreamEvent>) -> Self {
        Self {
            events,
            ..Self::with_text("", "")
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_text("", "")
        }
    }
}

#[async_trait]
impl ConverseBackend for MockBackend {
    async fn invoke(&self, req: &ConverseRequest) -> Result<ConverseOutput> {
        *self.last_request.lock().unwrap() = Some(req.clone());
        if self.fail {
            return Err(SidecarError::backend("failed to invoke backend: boom"));
        }
        Ok(self.output.clone())
    }

    async fn invoke_streaming(&self, req: &ConverseRequest) -> Result<ConverseEventStream> {
        *self.last_request.lock().unwrap() = Some(req.clone());
        if self.fail {
            return Err(SidecarError::backend("failed to invoke backend: boom"));
        }
        let events: Vec<Result<ConverseStreamEvent>> =
            self.events.clone().into_iter().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(events)))
    }
}

fn test_config() -> SidecarConfig {
    SidecarConfig {
        port: 0,
        backend: BackendConfig::default(),
        models: [(
            "test-model".to_string(),
            "backend.test-model-v1:0".to_string(),
        )]
        .into_iter()
        .collect::<ModelAliases>(),
    }
}

async fn spawn_server(backend: Arc<MockBackend>) -> String {
    let state = Arc::new(AppState {
        config: test_config(),
        backend: backend as Arc<dyn ConverseBackend>,
        clock: Clock::system(),
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn test_buffered_roundtrip() {
    let backend = Arc::new(MockBackend::with_text("Test response", "end_turn"));
    let base = spawn_server(backend.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/chat/completions"))
        .json(&serde_json::json!({
            "model": "test-model",
            "max_tokens": 1000,
            "temperature": 0.7,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant"},
                {"role": "user", "content": "Hello"}
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["object"], "chat.completion");
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["choices"][0]["index"], 0);
    assert_eq!(body["choices"][0]["message"]["role"], "assistant");
    assert_eq!(body["choices"][0]["message"]["content"], "Test response");
    assert_eq!(body["choices"][0]["finish_reason"], "end_turn");
    assert_eq!(
        body["usage"],
        serde_json::json!({"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0})
    );

    // The backend saw the translated request: alias resolved, system pulled out
    let seen = backend.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(seen.model_id, "backend.test-model-v1:0");
    assert_eq!(seen.system.as_ref().unwrap().len(), 1);
    assert_eq!(seen.messages.len(), 1);
    assert_eq!(seen.inference_config.max_tokens, Some(1000));
}

#[tokio::test]
async fn test_streaming_roundtrip() {
    let backend = Arc::new(MockBackend::with_events(vec![
        ConverseStreamEvent::MessageStart {
            role: "assistant".to_string(),
        },
        ConverseStreamEvent::ContentBlockStart {
            content_block_index: 0,
        },
        ConverseStreamEvent::ContentBlockDelta {
            content_block_index: 0,
            delta: ContentDelta::Text {
                text: "Hello".to_string(),
            },
        },
        ConverseStreamEvent::ContentBlockDelta {
            content_block_index: 0,
            delta: ContentDelta::Text {
                text: " world".to_string(),
            },
        },
        ConverseStreamEvent::ContentBlockStop {
            content_block_index: 0,
        },
        ConverseStreamEvent::MessageStop {
            stop_reason: "end_turn".to_string(),
        },
    ]));
    let base = spawn_server(backend.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/chat/completions"))
        .json(&serde_json::json!({
            "model": "test-model",
            "stream": true,
            "messages": [{"role": "user", "content": "Say hello"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let body = resp.text().await.unwrap();
    assert!(!body.contains("[DONE]"));

    let chunks: Vec<serde_json::Value> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    // one chunk per backend event, in order
    assert_eq!(chunks.len(), 6);
    for chunk in &chunks {
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["model"], "test-model");
    }

    assert_eq!(chunks[0]["choices"][0]["delta"]["role"], "assistant");
    assert_eq!(chunks[1]["choices"][0]["delta"], serde_json::json!({}));
    assert_eq!(chunks[2]["choices"][0]["delta"]["content"], "Hello");
    assert_eq!(chunks[3]["choices"][0]["delta"]["content"], " world");
    assert_eq!(chunks[4]["choices"][0]["delta"], serde_json::json!({}));
    assert_eq!(chunks[5]["choices"][0]["finish_reason"], "stop");
}

#[tokio::test]
async fn test_invalid_body_is_rejected() {
    let backend = Arc::new(MockBackend::with_text("", ""));
    let base = spawn_server(backend).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/chat/completions"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_backend_failure_is_surfaced() {
    let backend = Arc::new(MockBackend::failing());
    let base = spawn_server(backend).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/v1/chat/completions"))
        .json(&serde_json::json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "Hello"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("failed to invoke backend"));
}

#[tokio::test]
async fn test_chat_alias_route() {
    let backend = Arc::new(MockBackend::with_text("pong", "end_turn"));
    let base = spawn_server(backend).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/api/chat"))
        .json(&serde_json::json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "ping"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "pong");
}

#[tokio::test]
async fn test_health_and_models() {
    let backend = Arc::new(MockBackend::with_text("", ""));
    let base = spawn_server(backend).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);

    let models = client
        .get(format!("{base}/v1/models"))
        .send()
        .await
        .unwrap();
    assert_eq!(models.status(), 200);
    let body: serde_json::Value = models.json().await.unwrap();
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["id"], "test-model");
}
