//! Translate Chat Completions requests into Converse backend requests.
//!
//! System-role messages are pulled out of the dialogue into the backend's
//! dedicated system channel; everything else becomes a turn message wrapped
//! as a single text content block. Translation is total: an empty message
//! list is legal and yields an empty turn list.

use super::converse_types::{
    ContentBlock, ConverseMessage, ConverseRequest, InferenceConfig, SystemContentBlock,
};
use super::openai_types::{ChatCompletionRequest, ChatMessage};
use crate::config::ModelAliases;

/// Translate a Chat Completions request into a Converse request.
/// Pure function: takes the request + model aliases, returns the translated
/// request. The same record feeds both the buffered and the streaming
/// backend call; only the endpoint differs.
pub fn to_converse_request(req: &ChatCompletionRequest, models: &ModelAliases) -> ConverseRequest {
    let (system_texts, messages) = partition_system_messages(&req.messages);

    // No system messages means no system entry at all, not an empty one.
    let system = if system_texts.is_empty() {
        None
    } else {
        Some(vec![SystemContentBlock {
            text: system_texts.join("\n"),
        }])
    };

    ConverseRequest {
        model_id: models.resolve(&req.model),
        messages,
        system,
        inference_config: make_inference_config(req),
    }
}

/// Stable partition: system-role text on one side, every other message on
/// the other, each side keeping the original relative order.
fn partition_system_messages(messages: &[ChatMessage]) -> (Vec<String>, Vec<ConverseMessage>) {
    let mut system_texts = Vec::new();
    let mut turns = Vec::with_capacity(messages.len());

    for msg in messages {
        if msg.role == "system" {
            system_texts.push(msg.content.clone());
        } else {
            turns.push(ConverseMessage {
                role: msg.role.clone(),
                content: vec![ContentBlock::Text {
                    text: msg.content.clone(),
                }],
            });
        }
    }

    (system_texts, turns)
}

/// A sampling field carries through only when the client supplied it. A
/// deliberate zero is kept; absence stays absent.
fn make_inference_config(req: &ChatCompletionRequest) -> InferenceConfig {
    InferenceConfig {
        max_tokens: req.max_tokens,
        stop_sequences: req.stop.clone(),
        temperature: req.temperature.map(|t| t as f32),
        top_p: req.top_p.map(|p| p as f32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn request(messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "m".to_string(),
            messages,
            n: None,
            max_tokens: None,
            response_format: None,
            seed: None,
            stop: None,
            stream: false,
            temperature: None,
            top_p: None,
            extra: HashMap::default(),
        }
    }

    #[test]
    fn test_basic_conversion() {
        let mut req = request(vec![
            ChatMessage::new("system", "You are a helpful assistant"),
            ChatMessage::new("user", "Hello"),
        ]);
        req.max_tokens = Some(1000);
        req.temperature = Some(0.7);
        req.top_p = Some(0.9);
        req.stop = Some(vec!["\n".to_string(), "Human:".to_string()]);

        let result = to_converse_request(&req, &ModelAliases::default());

        let system = result.system.expect("system entry");
        assert_eq!(system.len(), 1);
        assert_eq!(system[0].text, "You are a helpful assistant");

        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, "user");
        assert!(matches!(
            result.messages[0].content[0],
            ContentBlock::Text { ref text } if text == "Hello"
        ));

        assert_eq!(
            result.inference_config,
            InferenceConfig {
                max_tokens: Some(1000),
                stop_sequences: Some(vec!["\n".to_string(), "Human:".to_string()]),
                temperature: Some(0.7),
                top_p: Some(0.9),
            }
        );
    }

    #[test]
    fn test_empty_optional_fields_stay_absent() {
        let req = request(vec![ChatMessage::new("user", "Hello")]);

        let result = to_converse_request(&req, &ModelAliases::default());

        assert!(result.system.is_none());
        assert_eq!(result.inference_config, InferenceConfig::default());
    }

    #[test]
    fn test_system_messages_joined_in_order() {
        let req = request(vec![
            ChatMessage::new("system", "first"),
            ChatMessage::new("user", "one"),
            ChatMessage::new("system", "second"),
            ChatMessage::new("assistant", "two"),
            ChatMessage::new("user", "three"),
        ]);

        let result = to_converse_request(&req, &ModelAliases::default());

        assert_eq!(result.system.unwrap()[0].text, "first\nsecond");

        let roles: Vec<&str> = result.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "user"]);
        let texts: Vec<&str> = result
            .messages
            .iter()
            .map(|m| match &m.content[0] {
                ContentBlock::Text { text } => text.as_str(),
                ContentBlock::Other(_) => panic!("expected text block"),
            })
            .collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn test_zero_temperature_is_carried() {
        let mut req = request(vec![ChatMessage::new("user", "Hello")]);
        req.temperature = Some(0.0);

        let result = to_converse_request(&req, &ModelAliases::default());
        assert_eq!(result.inference_config.temperature, Some(0.0));
    }

    #[test]
    fn test_model_alias_resolution() {
        let models: ModelAliases = [("m".to_string(), "backend.model-v2:0".to_string())]
            .into_iter()
            .collect();

        let req = request(vec![ChatMessage::new("user", "hi")]);
        let result = to_converse_request(&req, &models);
        assert_eq!(result.model_id, "backend.model-v2:0");

        let mut req = req;
        req.model = "unmapped".to_string();
        let result = to_converse_request(&req, &models);
        assert_eq!(result.model_id, "unmapped");
    }

    #[test]
    fn test_empty_message_list_is_legal() {
        let req = request(Vec::new());
        let result = to_converse_request(&req, &ModelAliases::default());
        assert!(result.messages.is_empty());
        assert!(result.system.is_none());
    }
}
