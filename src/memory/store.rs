//! Vector store abstraction
//!
//! A collection of text documents with string metadata. Stores embed documents
//! themselves on `add`, so callers only ever deal in text.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::{MemoryError, MemoryResult};

/// String metadata attached to a document
pub type Metadata = BTreeMap<String, String>;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
}

/// A document returned from a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity to the query, higher is closer
    pub score: f32,
}

/// Equality match on one metadata field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Embedded vector database
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and insert documents. Ids must be unique within the collection.
    async fn add(&self, documents: Vec<Document>) -> MemoryResult<()>;

    /// Return up to `k` documents most similar to `text`, best first,
    /// restricted to documents matching `filter` when given.
    async fn query(
        &self,
        text: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> MemoryResult<Vec<ScoredDocument>>;

    /// Return every document matching `filter`, in insertion order.
    async fn get(&self, filter: MetadataFilter) -> MemoryResult<Vec<Document>>;
}

/// Collection names and filter fields end up inside SQL identifiers and JSON
/// paths, so both are restricted to `[A-Za-z0-9_]`.
pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn validate_collection(name: &str) -> MemoryResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(MemoryError::InvalidCollection(name.to_string()))
    }
}

pub(crate) fn validate_filter(filter: &MetadataFilter) -> MemoryResult<()> {
    if is_identifier(&filter.field) {
        Ok(())
    } else {
        Err(MemoryError::InvalidFilter(filter.field.clone()))
    }
}
