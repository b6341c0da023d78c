//! Type definitions for the Converse-style backend wire format.
//!
//! Requests carry turn messages, an optional system-content channel, and an
//! inference-configuration record. Responses and stream events are modeled
//! as closed unions with named catch-all variants, so an unrecognized
//! backend kind is a value the translators can degrade on, never a panic,
//! and adding a new kind is a compile-time decision.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request types (what we send TO the backend)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    /// Resolved backend model identifier. Addressed in the URL path, never
    /// serialized into the body.
    #[serde(skip)]
    pub model_id: String,
    pub messages: Vec<ConverseMessage>,
    /// When present, holds exactly one entry: the newline-joined system
    /// text. Absent entirely when the client sent no system messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<SystemContentBlock>>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// A content block in a turn message, keyed by its single field. The
/// sidecar only ever produces text blocks; other kinds arrive from the
/// backend and are skipped during response translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBlock {
    Text { text: String },
    Other(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemContentBlock {
    pub text: String,
}

/// Sampling configuration. Every field is independently optional: a field
/// is serialized only when the client supplied it, so a deliberate zero is
/// carried and absence stays absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

// ---------------------------------------------------------------------------
// Buffered response types (what the backend sends back)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseOutput {
    #[serde(default)]
    pub output: Option<ConverseOutputKind>,
    #[serde(default)]
    pub stop_reason: String,
}

/// The `output` union of a buffered response. Unrecognized members are
/// captured whole so the response translator degrades instead of failing
/// the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConverseOutputKind {
    Message { message: OutputMessage },
    Unrecognized(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

// ---------------------------------------------------------------------------
// Stream event types
// ---------------------------------------------------------------------------

/// One event of a Converse stream. The `Unknown` variant absorbs event
/// kinds this sidecar does not recognize; they translate to an empty delta,
/// never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConverseStreamEvent {
    #[serde(rename_all = "camelCase")]
    MessageStart { role: String },
    #[serde(rename_all = "camelCase")]
    ContentBlockStart {
        #[serde(default)]
        content_block_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    ContentBlockDelta {
        #[serde(default)]
        content_block_index: u32,
        delta: ContentDelta,
    },
    #[serde(rename_all = "camelCase")]
    ContentBlockStop {
        #[serde(default)]
        content_block_index: u32,
    },
    #[serde(rename_all = "camelCase")]
    MessageStop { stop_reason: String },
    #[serde(rename_all = "camelCase")]
    Metadata {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<serde_json::Value>,
    },
    #[serde(other)]
    Unknown,
}

/// The delta union inside a `contentBlockDelta` event, keyed by field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentDelta {
    Text {
        text: String,
    },
    Reasoning {
        #[serde(rename = "reasoningContent")]
        reasoning_content: serde_json::Value,
    },
    ToolUse {
        #[serde(rename = "toolUse")]
        tool_use: serde_json::Value,
    },
}
