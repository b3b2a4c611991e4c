//! Gemini client implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use uuid::Uuid;

use crate::llm::core::{
    config::EndpointSettings,
    error::LlmError,
    provider::{EventStream, LlmProvider},
    types::{GenerateRequest, StreamEvent},
};
use crate::llm::sse::parse_sse_stream;

use super::mapper::{from_gemini_response, to_gemini_request};
use super::types::GenerateContentResponse;

/// Well-known Gemini model identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiModel {
    Gemini25Pro,
    Gemini25Flash,
    Gemini25FlashLite,
    /// Any other model id accepted by the API
    Custom(String),
}

impl GeminiModel {
    pub fn as_str(&self) -> &str {
        match self {
            GeminiModel::Gemini25Pro => "gemini-2.5-pro",
            GeminiModel::Gemini25Flash => "gemini-2.5-flash",
            GeminiModel::Gemini25FlashLite => "gemini-2.5-flash-lite",
            GeminiModel::Custom(id) => id,
        }
    }
}

impl From<&str> for GeminiModel {
    fn from(id: &str) -> Self {
        match id {
            "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
            "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
            "gemini-2.5-flash-lite" => GeminiModel::Gemini25FlashLite,
            other => GeminiModel::Custom(other.to_string()),
        }
    }
}

/// Client for Gemini's `streamGenerateContent` endpoint
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: GeminiModel,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: String, endpoint: EndpointSettings) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_key,
            model: GeminiModel::from(endpoint.model.as_str()),
            base_url: endpoint.base_url,
        })
    }

    fn build_endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            self.model.as_str()
        )
    }

    async fn make_streaming_request(
        &self,
        request: GenerateRequest,
    ) -> Result<EventStream, LlmError> {
        let gemini_request = to_gemini_request(request);

        let url = self.build_endpoint_url();
        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        let chunks =
            parse_sse_stream::<GenerateContentResponse>(Box::pin(response.bytes_stream()));

        let message_start = StreamEvent::MessageStart {
            id: Uuid::new_v4().to_string(),
        };
        let start = futures::stream::once(futures::future::ready(Ok::<_, LlmError>(message_start)));

        let events = chunks.flat_map(|result| {
            futures::stream::iter(match result.and_then(from_gemini_response) {
                Ok(events) => events.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
        });

        Ok(Box::pin(start.chain(events)))
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.make_streaming_request(request).await
    }
}
