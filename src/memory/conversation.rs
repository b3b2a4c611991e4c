//! Conversation memory on top of a vector store
//!
//! Every user message and completed assistant reply is stored as one document
//! tagged with its role and conversation id.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::MemoryResult;
use super::store::{Document, Metadata, MetadataFilter, VectorStore};

const ROLE_KEY: &str = "role";
const CONVERSATION_KEY: &str = "conversation_id";

/// Number of context snippets pulled into the prompt by default
pub const DEFAULT_CONTEXT_RESULTS: usize = 3;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A turn to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub conversation_id: String,
}

impl ConversationTurn {
    fn into_document(self) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert(ROLE_KEY.to_string(), self.role.as_str().to_string());
        metadata.insert(CONVERSATION_KEY.to_string(), self.conversation_id);
        Document {
            id: uuid::Uuid::new_v4().to_string(),
            content: self.content,
            metadata,
        }
    }
}

/// A stored turn as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// What to do when the store fails while a chat is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoryPolicy {
    /// Log and carry on with empty context
    #[default]
    FailOpen,
    /// Surface the failure to the caller
    FailClosed,
}

impl FromStr for MemoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "fail_open" | "open" => Ok(Self::FailOpen),
            "fail-closed" | "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!(
                "unknown memory policy '{}', expected 'fail-open' or 'fail-closed'",
                other
            )),
        }
    }
}

pub struct ConversationMemory {
    store: Arc<dyn VectorStore>,
    policy: MemoryPolicy,
}

impl std::fmt::Debug for ConversationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMemory")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ConversationMemory {
    pub fn new(store: Arc<dyn VectorStore>, policy: MemoryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> MemoryPolicy {
        self.policy
    }

    /// Persist one turn under a fresh document id.
    ///
    /// # Errors
    /// Only under [`MemoryPolicy::FailClosed`]; otherwise failures are logged.
    pub async fn store(
        &self,
        content: &str,
        role: TurnRole,
        conversation_id: &str,
    ) -> MemoryResult<()> {
        let turn = ConversationTurn {
            role,
            content: content.to_string(),
            conversation_id: conversation_id.to_string(),
        };

        match self.store.add(vec![turn.into_document()]).await {
            Ok(()) => {
                debug!(conversation_id, role = role.as_str(), "Stored turn");
                Ok(())
            }
            Err(e) => {
                warn!(conversation_id, role = role.as_str(), error = %e, "Failed to store turn");
                match self.policy {
                    MemoryPolicy::FailOpen => Ok(()),
                    MemoryPolicy::FailClosed => Err(e),
                }
            }
        }
    }

    /// Up to `k` stored texts most similar to `query`, joined with newlines.
    /// The search is scoped to `conversation_id` unless it is empty.
    ///
    /// # Errors
    /// Only under [`MemoryPolicy::FailClosed`]; otherwise failures yield "".
    pub async fn retrieve_context(
        &self,
        query: &str,
        conversation_id: &str,
        k: usize,
    ) -> MemoryResult<String> {
        let filter = (!conversation_id.is_empty())
            .then(|| MetadataFilter::eq(CONVERSATION_KEY, conversation_id));

        match self.store.query(query, k, filter).await {
            Ok(results) => Ok(results
                .into_iter()
                .map(|scored| scored.document.content)
                .collect::<Vec<_>>()
                .join("\n")),
            Err(e) => {
                warn!(conversation_id, error = %e, "Failed to retrieve context");
                match self.policy {
                    MemoryPolicy::FailOpen => Ok(String::new()),
                    MemoryPolicy::FailClosed => Err(e),
                }
            }
        }
    }

    /// All turns stored for a conversation. Failures always propagate.
    pub async fn history(&self, conversation_id: &str) -> MemoryResult<Vec<HistoryMessage>> {
        let documents = self
            .store
            .get(MetadataFilter::eq(CONVERSATION_KEY, conversation_id))
            .await?;

        Ok(documents
            .into_iter()
            .map(|document| HistoryMessage {
                role: document
                    .metadata
                    .get(ROLE_KEY)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                content: document.content,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embedder::testing::KeywordEmbedder;
    use crate::memory::sqlite::SqliteVectorStore;

    fn memory() -> (Arc<SqliteVectorStore>, ConversationMemory) {
        let store = Arc::new(
            SqliteVectorStore::open_in_memory("history", Arc::new(KeywordEmbedder)).unwrap(),
        );
        let memory = ConversationMemory::new(store.clone(), MemoryPolicy::FailOpen);
        (store, memory)
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("fail-open".parse::<MemoryPolicy>(), Ok(MemoryPolicy::FailOpen));
        assert_eq!("FAIL-CLOSED".parse::<MemoryPolicy>(), Ok(MemoryPolicy::FailClosed));
        assert!("sometimes".parse::<MemoryPolicy>().is_err());
        assert_eq!(MemoryPolicy::default(), MemoryPolicy::FailOpen);
    }

    #[test]
    fn test_turn_document_shape() {
        let doc = ConversationTurn {
            role: TurnRole::Assistant,
            content: "hi".to_string(),
            conversation_id: "c1".to_string(),
        }
        .into_document();

        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());
        assert_eq!(doc.content, "hi");
        assert_eq!(doc.metadata.get("role").map(String::as_str), Some("assistant"));
        assert_eq!(doc.metadata.get("conversation_id").map(String::as_str), Some("c1"));
    }

    #[tokio::test]
    async fn test_store_then_history() {
        let (_, memory) = memory();
        memory.store("hello", TurnRole::User, "c1").await.unwrap();
        memory.store("hi!", TurnRole::Assistant, "c1").await.unwrap();
        memory.store("elsewhere", TurnRole::User, "c2").await.unwrap();

        let history = memory.history("c1").await.unwrap();
        assert_eq!(
            history,
            vec![
                HistoryMessage { role: "user".into(), content: "hello".into() },
                HistoryMessage { role: "assistant".into(), content: "hi!".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_same_text_twice_gets_distinct_ids() {
        let (_, memory) = memory();
        memory.store("again", TurnRole::User, "c1").await.unwrap();
        memory.store("again", TurnRole::User, "c1").await.unwrap();
        assert_eq!(memory.history("c1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_role_defaults_to_unknown() {
        let (store, memory) = memory();
        let mut metadata = Metadata::new();
        metadata.insert("conversation_id".to_string(), "c1".to_string());
        store
            .add(vec![Document {
                id: "legacy".to_string(),
                content: "no role here".to_string(),
                metadata,
            }])
            .await
            .unwrap();

        let history = memory.history("c1").await.unwrap();
        assert_eq!(history[0].role, "unknown");
    }

    #[tokio::test]
    async fn test_retrieve_context_scoped_and_joined() {
        let (_, memory) = memory();
        memory.store("my cat is named Tom", TurnRole::User, "c1").await.unwrap();
        memory.store("Tom is a lovely cat name", TurnRole::Assistant, "c1").await.unwrap();
        memory.store("my cat is named Felix", TurnRole::User, "c2").await.unwrap();

        let context = memory.retrieve_context("cat named", "c1", 3).await.unwrap();
        let lines: Vec<_> = context.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!context.contains("Felix"));
    }

    #[tokio::test]
    async fn test_retrieve_context_empty_store() {
        let (_, memory) = memory();
        assert_eq!(memory.retrieve_context("anything", "c1", 3).await.unwrap(), "");
    }
}
