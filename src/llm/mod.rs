//! LLM Abstraction Layer
//!
//! A unified streaming interface over the OpenAI and Google Gemini APIs.
//! Providers are selected per request by name through a [`ProviderRegistry`].

pub mod core;
pub mod gemini;
pub mod openai;
pub mod sse;

// Re-export commonly used types
pub use self::core::{
    config::{EndpointSettings, GenerationConfig, ProviderSettings},
    error::LlmError,
    provider::{
        create_provider, EnvProviderRegistry, EventStream, LlmProvider, ProviderKind,
        ProviderRegistry,
    },
    types::{FinishReason, GenerateRequest, Message, MessageRole, StreamEvent, UsageMetadata},
};
