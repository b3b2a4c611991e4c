#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use ragstream::llm::{
    EventStream, FinishReason, GenerateRequest, LlmError, LlmProvider, ProviderRegistry,
    StreamEvent, UsageMetadata,
};
use ragstream::memory::{
    ConversationMemory, Document, Embedder, MemoryError, MemoryPolicy, MemoryResult,
    MetadataFilter, ScoredDocument, SqliteVectorStore, VectorStore, DEFAULT_DIMENSIONS,
};
use ragstream::models::ChatEvent;
use ragstream::orchestrator::{ChatEventStream, ResponseOrchestrator};

/// One step of a scripted provider response
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    /// Error raised mid-stream
    Fail(&'static str),
}

/// Provider that replays a fixed script and records what it was asked
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    steps: Vec<Step>,
    reject_request: Option<&'static str>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedProvider {
    pub fn replying(texts: &[&'static str]) -> Self {
        Self {
            steps: texts.iter().copied().map(Step::Text).collect(),
            ..Default::default()
        }
    }

    pub fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    /// Fail before any stream is returned
    pub fn rejecting(message: &'static str) -> Self {
        Self {
            reject_request: Some(message),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.requests.lock().unwrap().push(request);

        if let Some(message) = self.reject_request {
            return Err(LlmError::HttpError {
                status: 500,
                body: message.to_string(),
            });
        }

        let mut events: Vec<Result<StreamEvent, LlmError>> = vec![Ok(StreamEvent::MessageStart {
            id: "scripted".to_string(),
        })];
        let mut failed = false;
        for step in &self.steps {
            match step {
                Step::Text(text) => events.push(Ok(StreamEvent::TextDelta {
                    text: text.to_string(),
                })),
                Step::Fail(message) => {
                    events.push(Err(LlmError::StreamError(message.to_string())));
                    failed = true;
                }
            }
        }
        if !failed {
            events.push(Ok(StreamEvent::MessageEnd {
                finish_reason: FinishReason::Stop,
                usage: UsageMetadata::default(),
            }));
        }

        Ok(Box::pin(futures::stream::iter(events)))
    }
}

/// Registry serving scripted providers by name
#[derive(Clone, Default)]
pub struct ScriptedRegistry {
    providers: Vec<(&'static str, ScriptedProvider)>,
}

impl ScriptedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, provider: ScriptedProvider) -> Self {
        self.providers.push((name, provider));
        self
    }
}

impl ProviderRegistry for ScriptedRegistry {
    fn resolve(&self, name: &str) -> Result<Box<dyn LlmProvider>, LlmError> {
        self.providers
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, provider)| Box::new(provider.clone()) as Box<dyn LlmProvider>)
            .ok_or_else(|| LlmError::ProviderUnavailable(name.to_string()))
    }
}

/// Bag-of-words embedder, so tests need no model download
#[derive(Debug, Default)]
pub struct KeywordEmbedder;

impl Embedder for KeywordEmbedder {
    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        let mut vector = vec![0.0f32; DEFAULT_DIMENSIONS];
        vector[0] = 0.1;
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            vector[1 + (hasher.finish() as usize % (DEFAULT_DIMENSIONS - 1))] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }
}

pub fn keyword_embedder() -> Arc<dyn Embedder> {
    Arc::new(KeywordEmbedder)
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn add(&self, _documents: Vec<Document>) -> MemoryResult<()> {
        Err(MemoryError::Embedding("store offline".to_string()))
    }

    async fn query(
        &self,
        _text: &str,
        _k: usize,
        _filter: Option<MetadataFilter>,
    ) -> MemoryResult<Vec<ScoredDocument>> {
        Err(MemoryError::Embedding("store offline".to_string()))
    }

    async fn get(&self, _filter: MetadataFilter) -> MemoryResult<Vec<Document>> {
        Err(MemoryError::Embedding("store offline".to_string()))
    }
}

pub fn in_memory(policy: MemoryPolicy) -> Arc<ConversationMemory> {
    let store = SqliteVectorStore::open_in_memory("conversation_history", keyword_embedder())
        .expect("in-memory store");
    Arc::new(ConversationMemory::new(Arc::new(store), policy))
}

pub fn failing_memory(policy: MemoryPolicy) -> Arc<ConversationMemory> {
    Arc::new(ConversationMemory::new(Arc::new(FailingStore), policy))
}

pub fn orchestrator(
    memory: Arc<ConversationMemory>,
    registry: ScriptedRegistry,
) -> ResponseOrchestrator {
    ResponseOrchestrator::new(memory, Arc::new(registry))
}

pub async fn collect_events(stream: ChatEventStream) -> Vec<ChatEvent> {
    stream.collect().await
}
