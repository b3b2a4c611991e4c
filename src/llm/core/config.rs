//! Generation and provider settings

use serde::{Deserialize, Serialize};

/// Sampling parameters shared by every provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Randomness (0.0-2.0 for OpenAI, 0.0-1.0 for Gemini)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerationConfig {
    /// Create a new configuration with the specified max tokens
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: None,
            top_p: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the top_p value
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(1024).with_temperature(0.7)
    }
}

/// Endpoint and model for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSettings {
    /// Base URL without a trailing slash (e.g. `https://api.openai.com`)
    pub base_url: String,
    /// Model identifier sent to the provider
    pub model: String,
}

impl EndpointSettings {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

/// Everything needed to build a provider client except the API key
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub openai: EndpointSettings,
    pub gemini: EndpointSettings,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai: EndpointSettings::new("https://api.openai.com", "gpt-3.5-turbo"),
            gemini: EndpointSettings::new(
                "https://generativelanguage.googleapis.com",
                "gemini-2.5-flash",
            ),
        }
    }
}
