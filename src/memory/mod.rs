//! Conversation memory backed by an embedded vector store

pub mod conversation;
pub mod embedder;
pub mod error;
pub mod sqlite;
pub mod store;

pub use conversation::{
    ConversationMemory, ConversationTurn, HistoryMessage, MemoryPolicy, TurnRole,
    DEFAULT_CONTEXT_RESULTS,
};
pub use embedder::{Embedder, MiniLmEmbedder, DEFAULT_DIMENSIONS};
pub use error::{MemoryError, MemoryResult};
pub use sqlite::{SqliteVectorStore, PARTITION_FIELD};
pub use store::{Document, Metadata, MetadataFilter, ScoredDocument, VectorStore};
