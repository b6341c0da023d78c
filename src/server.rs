use crate::backend::ConverseBackend;
use crate::clock::Clock;
use crate::config::SidecarConfig;
use crate::translate::openai_types::{ChatCompletionRequest, ChatErrorResponse};
use crate::translate::request::to_converse_request;
use crate::translate::response::to_chat_response;
use crate::translate::streaming::to_chat_chunk;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::stream::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: SidecarConfig,
    pub backend: Arc<dyn ConverseBackend>,
    pub clock: Clock,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/api/chat", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .route("/v1/models", get(handle_models))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse request body");
            let err = ChatErrorResponse::invalid_request(format!("Invalid request body: {e}"));
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    tracing::info!(
        model = %req.model,
        streaming = req.stream,
        messages = req.messages.len(),
        "Request"
    );

    if req.stream {
        handle_streaming(state, req).await
    } else {
        handle_buffered(state, req).await
    }
}

async fn handle_buffered(state: Arc<AppState>, req: ChatCompletionRequest) -> Response {
    let converse_req = to_converse_request(&req, &state.config.models);

    match state.backend.invoke(&converse_req).await {
        Ok(output) => {
            let resp = to_chat_response(&output, &req.model, &state.clock);
            Json(resp).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Backend invocation failed");
            let err = ChatErrorResponse::api_error(e.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response()
        }
    }
}

/// One SSE `data:` frame per backend event, in arrival order; no `[DONE]`
/// sentinel. The loop is driven by the client connection: when the client
/// goes away the stream is dropped and no further backend events are
/// pulled. A chunk that fails to serialize terminates the stream; a
/// partial frame is never written.
async fn handle_streaming(state: Arc<AppState>, req: ChatCompletionRequest) -> Response {
    let converse_req = to_converse_request(&req, &state.config.models);

    let mut events = match state.backend.invoke_streaming(&converse_req).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Backend streaming invocation failed");
            let err = ChatErrorResponse::api_error(e.to_string());
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(err)).into_response();
        }
    };

    let model = req.model.clone();
    let clock = state.clock.clone();

    let chunk_stream = async_stream::stream! {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let chunk = to_chat_chunk(&event, &model, &clock);
                    match serde_json::to_string(&chunk) {
                        Ok(json) => yield Ok::<Event, Infallible>(Event::default().data(json)),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize chunk, closing stream");
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Backend stream error, closing stream");
                    break;
                }
            }
        }
    };

    Sse::new(chunk_stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let models: Vec<serde_json::Value> = state
        .config
        .models
        .names()
        .map(|name| {
            serde_json::json!({
                "id": name,
                "object": "model",
                "owned_by": "converse-sidecar",
            })
        })
        .collect();

    Json(serde_json::json!({ "data": models, "object": "list" }))
}
