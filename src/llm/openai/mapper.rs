//! Mapping between abstraction types and OpenAI Chat Completions types

use crate::llm::core::{
    error::LlmError,
    types::{FinishReason, GenerateRequest, MessageRole, StreamEvent, UsageMetadata},
};

use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChatMessage};

/// Convert our abstraction request to a streaming chat completion request
///
/// The system prompt becomes a leading `system` message.
pub fn to_openai_request(request: GenerateRequest, model: &str) -> ChatCompletionRequest {
    let system = request.system.map(|content| ChatMessage {
        role: "system".to_string(),
        content,
    });

    let messages = system
        .into_iter()
        .chain(request.messages.into_iter().map(|message| ChatMessage {
            role: match message.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            }
            .to_string(),
            content: message.content,
        }))
        .collect();

    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        stream: true,
        max_tokens: Some(request.config.max_tokens),
        temperature: request.config.temperature,
        top_p: request.config.top_p,
    }
}

/// Convert one streamed chunk to stream events
pub fn from_openai_chunk(chunk: ChatCompletionChunk) -> Result<Vec<StreamEvent>, LlmError> {
    if let Some(error) = chunk.error {
        return Err(LlmError::ProviderError {
            code: error
                .code
                .or(error.kind)
                .unwrap_or_else(|| "unknown".to_string()),
            message: error.message,
        });
    }

    let mut events = Vec::new();
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(events);
    };

    if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
        events.push(StreamEvent::TextDelta { text });
    }

    if let Some(reason) = choice.finish_reason {
        let usage = chunk
            .usage
            .map(|usage| UsageMetadata {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        events.push(StreamEvent::MessageEnd {
            finish_reason: map_finish_reason(&reason),
            usage,
        });
    }

    Ok(events)
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::MaxTokens,
        "content_filter" => FinishReason::Safety,
        other => FinishReason::Other(other.to_string()),
    }
}
