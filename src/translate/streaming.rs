//! Per-event translation of Converse stream events into client chunks.
//!
//! Each backend event becomes exactly one [`ChatCompletionChunk`], carrying
//! at most one of a role announcement, a text fragment, or a finish reason.
//! The translator holds no state across events: which delta a chunk carries
//! is determined entirely by the incoming event kind. Events are translated
//! in arrival order and never buffered or reordered.

use super::converse_types::{ContentDelta, ConverseStreamEvent};
use super::openai_types::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
use crate::clock::Clock;

/// What a single backend event contributes to its client chunk. `Empty` is
/// the explicit no-contribution outcome for event kinds with no
/// chat-completions counterpart; the chunk is still emitted, with an empty
/// delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaPayload {
    Role(String),
    Text(String),
    Finish(&'static str),
    Empty,
}

/// Classify one backend event. The match is exhaustive over the closed
/// event union, so a new backend event kind is a compile-time decision
/// here, not a silent fallthrough.
pub fn event_payload(event: &ConverseStreamEvent) -> DeltaPayload {
    match event {
        ConverseStreamEvent::MessageStart { role } => DeltaPayload::Role(role.clone()),
        ConverseStreamEvent::ContentBlockDelta { delta, .. } => match delta {
            ContentDelta::Text { text } => DeltaPayload::Text(text.clone()),
            ContentDelta::Reasoning { .. } | ContentDelta::ToolUse { .. } => {
                tracing::debug!("skipping content delta kind with no client counterpart");
                DeltaPayload::Empty
            }
        },
        ConverseStreamEvent::MessageStop { stop_reason } => {
            DeltaPayload::Finish(map_stop_reason(stop_reason))
        }
        ConverseStreamEvent::ContentBlockStart { .. }
        | ConverseStreamEvent::ContentBlockStop { .. }
        | ConverseStreamEvent::Metadata { .. } => DeltaPayload::Empty,
        ConverseStreamEvent::Unknown => {
            tracing::debug!("skipping unknown stream event kind");
            DeltaPayload::Empty
        }
    }
}

/// Translate one backend stream event into exactly one client chunk.
///
/// `model` is the name the client originally requested.
pub fn to_chat_chunk(
    event: &ConverseStreamEvent,
    model: &str,
    clock: &Clock,
) -> ChatCompletionChunk {
    let mut choice = ChunkChoice {
        index: 0,
        delta: ChunkDelta::default(),
        finish_reason: None,
    };

    match event_payload(event) {
        DeltaPayload::Role(role) => choice.delta.role = Some(role),
        DeltaPayload::Text(text) => choice.delta.content = Some(text),
        DeltaPayload::Finish(reason) => choice.finish_reason = Some(reason.to_string()),
        DeltaPayload::Empty => {}
    }

    ChatCompletionChunk {
        id: clock.completion_id(),
        object: "chat.completion.chunk".to_string(),
        created: clock.unix_seconds(),
        model: model.to_string(),
        choices: vec![choice],
    }
}

/// Map a backend stop reason to a client finish reason. Total: anything
/// outside the enumerated set maps to "stop".
pub fn map_stop_reason(stop_reason: &str) -> &'static str {
    match stop_reason {
        "end_turn" | "stop_sequence" => "stop",
        "max_tokens" => "length",
        "content_filtered" | "guardrail_intervened" => "content_filter",
        "tool_use" => "tool_calls",
        _ => "stop",
    }
}
