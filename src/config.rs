//! Startup configuration read from the environment
//!
//! A `.env` file is honoured by the binary (via `dotenvy`) before this runs.
//! Provider API keys are deliberately absent: they are looked up per request.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::llm::{EndpointSettings, GenerationConfig, ProviderSettings};
use crate::memory::{MemoryPolicy, DEFAULT_CONTEXT_RESULTS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub vector_db_path: PathBuf,
    pub vector_collection: String,
    /// Where the embedding model is cached; fastembed's default when unset
    pub embedding_cache_dir: Option<PathBuf>,
    pub context_results: usize,
    pub memory_policy: MemoryPolicy,
    pub providers: ProviderSettings,
    pub generation: GenerationConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let defaults = ProviderSettings::default();

        let temperature: f32 = parse_var(&get, "LLM_TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                var: "LLM_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }
        let max_tokens: u32 = parse_var(&get, "LLM_MAX_TOKENS", 1024)?;

        Ok(Self {
            host: parse_var(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_var(&get, "PORT", 8000)?,
            vector_db_path: get("VECTOR_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/memory.sqlite3")),
            vector_collection: get("VECTOR_COLLECTION")
                .unwrap_or_else(|| "conversation_history".to_string()),
            embedding_cache_dir: get("EMBEDDING_CACHE_DIR").map(PathBuf::from),
            context_results: parse_var(&get, "CONTEXT_RESULTS", DEFAULT_CONTEXT_RESULTS)?,
            memory_policy: parse_var(&get, "MEMORY_POLICY", MemoryPolicy::FailOpen)?,
            providers: ProviderSettings {
                openai: EndpointSettings::new(
                    get("OPENAI_BASE_URL").unwrap_or(defaults.openai.base_url),
                    get("OPENAI_MODEL").unwrap_or(defaults.openai.model),
                ),
                gemini: EndpointSettings::new(
                    get("GEMINI_BASE_URL").unwrap_or(defaults.gemini.base_url),
                    get("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
                ),
            },
            generation: GenerationConfig::new(max_tokens).with_temperature(temperature),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
