//! The Converse backend capability and its HTTP implementation.
//!
//! The sidecar needs exactly two things from its backend: a buffered
//! invocation and a streaming one, both fallible. [`ConverseBackend`] is
//! that seam; the server is written against the trait and tests stand in
//! a canned backend. Errors crossing the seam are surfaced opaquely,
//! never classified or retried.

use crate::config::SidecarConfig;
use crate::error::{Result, SidecarError};
use crate::translate::converse_types::{ConverseOutput, ConverseRequest, ConverseStreamEvent};

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;

/// A lazily pulled sequence of backend stream events. The consumer drives
/// it one event at a time; dropping it cancels the underlying request.
pub type ConverseEventStream = Pin<Box<dyn Stream<Item = Result<ConverseStreamEvent>> + Send>>;

#[async_trait]
pub trait ConverseBackend: Send + Sync {
    async fn invoke(&self, req: &ConverseRequest) -> Result<ConverseOutput>;
    async fn invoke_streaming(&self, req: &ConverseRequest) -> Result<ConverseEventStream>;
}

/// Client for a Converse-style REST backend: `POST /model/{id}/converse`
/// for buffered calls, `POST /model/{id}/converse-stream` (SSE) for
/// streaming ones.
pub struct HttpConverseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpConverseClient {
    pub fn from_config(config: &SidecarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            base_url: config.effective_base_url()?,
            api_key: config.resolve_api_key()?,
        })
    }

    fn converse_url(&self, model_id: &str, action: &str) -> String {
        format!("{}/model/{}/{}", self.base_url, model_id, action)
    }
}

#[async_trait]
impl ConverseBackend for HttpConverseClient {
    async fn invoke(&self, req: &ConverseRequest) -> Result<ConverseOutput> {
        let url = self.converse_url(&req.model_id, "converse");
        tracing::debug!(%url, "POST converse");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| SidecarError::backend(format!("failed to invoke backend: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SidecarError::backend(format!("failed to read backend response: {e}")))?;

        if status >= 400 {
            return Err(SidecarError::backend(format!(
                "backend returned status {}: {}",
                status,
                truncate(&body, 500)
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            SidecarError::translation(format!(
                "failed to parse backend response: {}. Body: {}",
                e,
                truncate(&body, 300)
            ))
        })
    }

    async fn invoke_streaming(&self, req: &ConverseRequest) -> Result<ConverseEventStream> {
        let url = self.converse_url(&req.model_id, "converse-stream");
        tracing::debug!(%url, "POST converse-stream");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(|e| SidecarError::backend(format!("failed to invoke backend: {e}")))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SidecarError::backend(format!(
                "backend returned status {}: {}",
                status,
                truncate(&body, 500)
            )));
        }

        let mut frames = Box::pin(response.bytes_stream().eventsource());

        let events = async_stream::stream! {
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(frame) => match serde_json::from_str::<ConverseStreamEvent>(&frame.data) {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            // one undecodable frame never fails the stream
                            tracing::debug!(error = %e, "Skipping unparseable stream event");
                        }
                    },
                    Err(e) => {
                        yield Err(SidecarError::backend(format!("backend stream error: {e}")));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(events))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        &s[..max]
    }
}
