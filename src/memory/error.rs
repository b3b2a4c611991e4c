use thiserror::Error;

/// Errors raised by the vector store and conversation memory
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid collection name '{0}': use letters, digits and underscores")]
    InvalidCollection(String),

    #[error("Invalid filter field '{0}'")]
    InvalidFilter(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document with id {0} already exists")]
    DuplicateId(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Store connection lock poisoned")]
    LockPoisoned,

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type MemoryResult<T> = Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_collection_message() {
        let err = MemoryError::InvalidCollection("bad-name".to_string());
        assert!(err.to_string().contains("bad-name"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MemoryError = json_err.into();
        assert!(matches!(err, MemoryError::Serialization(_)));
    }
}
