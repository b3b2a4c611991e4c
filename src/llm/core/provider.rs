//! Provider trait, provider selection and the request-time registry

use async_trait::async_trait;
use futures::stream::Stream;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use super::{
    config::ProviderSettings,
    error::LlmError,
    types::{GenerateRequest, StreamEvent},
};
use crate::llm::gemini::GeminiClient;
use crate::llm::openai::OpenAiClient;

/// Stream of incremental generation events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Main interface that all LLM provider implementations must satisfy
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream generate content from the LLM
    ///
    /// Returns an error if the request cannot be started (connection failure,
    /// non-2xx status). Failures after the first byte surface as `Err` items
    /// on the returned stream.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError>;
}

/// The closed set of supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

impl ProviderKind {
    /// Name used in chat requests
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Environment variable holding the provider's API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(LlmError::ProviderUnavailable(other.to_string())),
        }
    }
}

/// Create an LLM provider client for `kind`
///
/// # Example
///
/// ```rust,no_run
/// use ragstream::llm::{create_provider, ProviderKind, ProviderSettings};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = create_provider(
///     ProviderKind::Gemini,
///     "my-api-key".to_string(),
///     &ProviderSettings::default(),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn create_provider(
    kind: ProviderKind,
    api_key: String,
    settings: &ProviderSettings,
) -> Result<Box<dyn LlmProvider>, LlmError> {
    match kind {
        ProviderKind::OpenAi => {
            let client = OpenAiClient::new(api_key, settings.openai.clone())?;
            Ok(Box::new(client))
        }
        ProviderKind::Gemini => {
            let client = GeminiClient::new(api_key, settings.gemini.clone())?;
            Ok(Box::new(client))
        }
    }
}

/// Resolves a request-supplied provider name into a ready client
pub trait ProviderRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Box<dyn LlmProvider>, LlmError>;
}

type CredentialLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Registry that reads API keys from the process environment on every call,
/// so keys can be added or rotated without a restart.
#[derive(Clone)]
pub struct EnvProviderRegistry {
    settings: ProviderSettings,
    lookup: CredentialLookup,
}

impl EnvProviderRegistry {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_lookup(settings, |var| std::env::var(var).ok())
    }

    /// Use a custom credential source instead of the process environment
    pub fn with_lookup<F>(settings: ProviderSettings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            settings,
            lookup: Arc::new(lookup),
        }
    }

    fn api_key(&self, kind: ProviderKind) -> Option<String> {
        (self.lookup)(kind.api_key_var()).filter(|key| !key.trim().is_empty())
    }
}

impl ProviderRegistry for EnvProviderRegistry {
    fn resolve(&self, name: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
        let kind: ProviderKind = name.parse()?;
        let api_key = self
            .api_key(kind)
            .ok_or_else(|| LlmError::ProviderUnavailable(kind.to_string()))?;
        create_provider(kind, api_key, &self.settings)
    }
}

impl fmt::Debug for EnvProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvProviderRegistry")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
