//! OpenAI client implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;

use crate::llm::core::{
    config::EndpointSettings,
    error::LlmError,
    provider::{EventStream, LlmProvider},
    types::{GenerateRequest, StreamEvent},
};
use crate::llm::sse::parse_sse_stream;

use super::mapper::{from_openai_chunk, to_openai_request};
use super::types::ChatCompletionChunk;

/// Client for the streaming Chat Completions endpoint
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client
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
            base_url: endpoint.base_url,
            model: endpoint.model,
        })
    }

    fn build_endpoint_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    async fn make_streaming_request(
        &self,
        request: GenerateRequest,
    ) -> Result<EventStream, LlmError> {
        let openai_request = to_openai_request(request, &self.model);

        let response = self
            .http_client
            .post(self.build_endpoint_url())
            .bearer_auth(&self.api_key)
            .json(&openai_request)
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

        let chunks = parse_sse_stream::<ChatCompletionChunk>(Box::pin(response.bytes_stream()));

        // OpenAI repeats the completion id on every chunk; surface it once.
        let mut started = false;
        let events = chunks.flat_map(move |result| {
            let mut out: Vec<Result<StreamEvent, LlmError>> = Vec::new();
            match result {
                Ok(chunk) => {
                    if !started && chunk.error.is_none() {
                        started = true;
                        out.push(Ok(StreamEvent::MessageStart {
                            id: chunk.id.clone(),
                        }));
                    }
                    match from_openai_chunk(chunk) {
                        Ok(events) => out.extend(events.into_iter().map(Ok)),
                        Err(e) => out.push(Err(e)),
                    }
                }
                Err(e) => out.push(Err(e)),
            }
            futures::stream::iter(out)
        });

        Ok(Box::pin(events))
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.make_streaming_request(request).await
    }
}
