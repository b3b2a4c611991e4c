//! Mapping between abstraction types and Gemini types

use crate::llm::core::{
    config::GenerationConfig,
    error::LlmError,
    types::{FinishReason, GenerateRequest, Message, MessageRole, StreamEvent, UsageMetadata},
};

use super::types::{
    Content, GeminiGenerationConfig, GenerateContentRequest, GenerateContentResponse, Part,
    SystemInstruction,
};

/// Convert our abstraction request to Gemini's request format
pub fn to_gemini_request(request: GenerateRequest) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: request.messages.into_iter().map(to_gemini_content).collect(),
        system_instruction: request.system.map(|s| SystemInstruction {
            parts: vec![Part::text(s)],
        }),
        generation_config: Some(to_gemini_generation_config(request.config)),
    }
}

fn to_gemini_content(message: Message) -> Content {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    };

    Content {
        role: role.to_string(),
        parts: vec![Part::text(message.content)],
    }
}

fn to_gemini_generation_config(config: GenerationConfig) -> GeminiGenerationConfig {
    GeminiGenerationConfig {
        max_output_tokens: Some(config.max_tokens),
        temperature: config.temperature,
        top_p: config.top_p,
    }
}

/// Convert one Gemini response chunk to stream events
///
/// A chunk whose prompt was blocked is an error; everything else yields zero or
/// more text deltas, followed by `MessageEnd` once a finish reason appears.
pub fn from_gemini_response(
    response: GenerateContentResponse,
) -> Result<Vec<StreamEvent>, LlmError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone())
    {
        return Err(LlmError::ProviderError {
            code: "prompt_blocked".to_string(),
            message: format!("Gemini blocked the prompt: {}", reason),
        });
    }

    let mut events = Vec::new();
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(events);
    };

    events.extend(
        candidate
            .content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .filter(|text| !text.is_empty())
            .map(|text| StreamEvent::TextDelta { text }),
    );

    if let Some(reason) = candidate.finish_reason {
        let usage = response
            .usage_metadata
            .map(|usage| UsageMetadata {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
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
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" => FinishReason::Safety,
        other => FinishReason::Other(other.to_string()),
    }
}
