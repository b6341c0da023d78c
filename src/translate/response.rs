//! Translate a buffered Converse response into a Chat Completions response.

use super::converse_types::{ContentBlock, ConverseOutput, ConverseOutputKind};
use super::openai_types::{ChatChoice, ChatCompletionResponse, ChatMessage, ChatUsage};
use crate::clock::Clock;

/// Translate a buffered backend response. Pure function over its inputs and
/// the injected clock, and total: a response without a usable message output
/// degrades to a synthesized error choice, it never fails the exchange.
///
/// `model` is the name the client originally requested.
pub fn to_chat_response(
    output: &ConverseOutput,
    model: &str,
    clock: &Clock,
) -> ChatCompletionResponse {
    let message = match output.output {
        Some(ConverseOutputKind::Message { ref message }) => message,
        Some(ConverseOutputKind::Unrecognized(_)) | None => {
            return invalid_message_response(model, clock);
        }
    };

    // First text block wins; later text blocks, if any, are dropped.
    let content = message
        .content
        .iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            ContentBlock::Other(_) => None,
        })
        .unwrap_or_default();

    ChatCompletionResponse {
        id: clock.completion_id(),
        object: "chat.completion".to_string(),
        created: clock.unix_seconds(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage::new("assistant", content),
            // The buffered path reports the backend's stop reason verbatim;
            // only the streaming path maps it to a finish reason.
            finish_reason: output.stop_reason.clone(),
        }],
        usage: ChatUsage::default(),
    }
}

fn invalid_message_response(model: &str, clock: &Clock) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: clock.completion_id(),
        object: "chat.completion".to_string(),
        created: clock.unix_seconds(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage::new("system", "Error: invalid message type"),
            finish_reason: "error".to_string(),
        }],
        usage: ChatUsage::default(),
    }
}
