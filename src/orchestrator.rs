//! Per-request chat pipeline
//!
//! Turns one chat request into an ordered stream of [`ChatEvent`]s:
//! conversation id, thinking, tokens, then exactly one `done` or `error`.
//! Memory is written before the provider is called and again after a
//! successful stream, so a failed generation never leaves an assistant turn.

use async_stream::stream;
use futures::stream::Stream;
use futures::StreamExt;
use pin_utils::pin_mut;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{error, info};

use crate::llm::{
    GenerateRequest, GenerationConfig, LlmError, LlmProvider, Message, ProviderRegistry,
    StreamEvent,
};
use crate::memory::{ConversationMemory, MemoryError, TurnRole, DEFAULT_CONTEXT_RESULTS};
use crate::models::ChatEvent;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to conversation history.";

/// Stream of events for a single chat request
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Failures that end a chat stream
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// Build the system prompt, appending retrieved context when there is any
pub fn build_system_prompt(context: &str) -> String {
    if context.is_empty() {
        SYSTEM_PROMPT.to_string()
    } else {
        format!(
            "{}\n\nRelevant context from previous conversation:\n{}",
            SYSTEM_PROMPT, context
        )
    }
}

/// Use the supplied id when it is non-empty, otherwise mint a UUID v4
pub fn resolve_conversation_id(supplied: Option<String>) -> String {
    supplied
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[derive(Clone)]
pub struct ResponseOrchestrator {
    memory: Arc<ConversationMemory>,
    registry: Arc<dyn ProviderRegistry>,
    generation: GenerationConfig,
    context_results: usize,
}

impl std::fmt::Debug for ResponseOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseOrchestrator")
            .field("memory", &self.memory)
            .field("generation", &self.generation)
            .field("context_results", &self.context_results)
            .finish_non_exhaustive()
    }
}

impl ResponseOrchestrator {
    pub fn new(memory: Arc<ConversationMemory>, registry: Arc<dyn ProviderRegistry>) -> Self {
        Self {
            memory,
            registry,
            generation: GenerationConfig::default(),
            context_results: DEFAULT_CONTEXT_RESULTS,
        }
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_context_results(mut self, context_results: usize) -> Self {
        self.context_results = context_results;
        self
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Run one chat turn as an event stream. Every failure is reported
    /// in-band as a single terminal `error` event.
    pub fn stream_response(
        &self,
        message: String,
        provider: String,
        conversation_id: Option<String>,
    ) -> ChatEventStream {
        let this = self.clone();

        Box::pin(stream! {
            let conversation_id = resolve_conversation_id(conversation_id);
            info!(%conversation_id, %provider, "Starting chat response");

            yield ChatEvent::conversation_id(conversation_id.clone());
            tokio::task::yield_now().await;

            let context = match this.remember_and_recall(&message, &conversation_id).await {
                Ok(context) => context,
                Err(e) => {
                    yield ChatEvent::error(e.to_string());
                    return;
                }
            };

            yield ChatEvent::thinking();
            tokio::task::yield_now().await;

            let llm = match this.registry.resolve(&provider) {
                Ok(llm) => llm,
                Err(e) => {
                    error!(%conversation_id, %provider, error = %e, "Provider unavailable");
                    yield ChatEvent::error(e.to_string());
                    return;
                }
            };

            let request = GenerateRequest {
                messages: vec![Message::user(message)],
                config: this.generation.clone(),
                system: Some(build_system_prompt(&context)),
            };

            let llm_stream = match llm.stream_generate(request).await {
                Ok(s) => s,
                Err(e) => {
                    error!(%conversation_id, %provider, error = %e, "Provider request failed");
                    yield ChatEvent::error(e.to_string());
                    return;
                }
            };

            pin_mut!(llm_stream);

            let mut full_response = String::new();
            while let Some(event_result) = llm_stream.next().await {
                match event_result {
                    Ok(StreamEvent::TextDelta { text }) => {
                        full_response.push_str(&text);
                        yield ChatEvent::token(text);
                        tokio::task::yield_now().await;
                    }
                    Ok(StreamEvent::MessageEnd { .. }) => break,
                    Ok(StreamEvent::MessageStart { .. }) => {}
                    Err(e) => {
                        error!(%conversation_id, %provider, error = %e, "Provider stream failed");
                        yield ChatEvent::error(e.to_string());
                        return;
                    }
                }
            }

            if let Err(e) = this
                .memory
                .store(&full_response, TurnRole::Assistant, &conversation_id)
                .await
            {
                yield ChatEvent::error(ChatError::from(e).to_string());
                return;
            }

            info!(%conversation_id, chars = full_response.len(), "Chat response complete");
            yield ChatEvent::done();
        })
    }

    /// Persist the user turn, then pull related context for the prompt
    async fn remember_and_recall(
        &self,
        message: &str,
        conversation_id: &str,
    ) -> Result<String, ChatError> {
        self.memory
            .store(message, TurnRole::User, conversation_id)
            .await?;
        let context = self
            .memory
            .retrieve_context(message, conversation_id, self.context_results)
            .await?;
        Ok(context)
    }
}
