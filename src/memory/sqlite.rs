//! SQLite-backed vector store
//!
//! Each collection is a plain table of documents plus a sqlite-vec `vec0`
//! table holding their embeddings. The vector table is partitioned on the
//! `conversation_id` metadata field so a scoped nearest-neighbour search only
//! ever looks at one conversation.

use async_trait::async_trait;
use rusqlite::ffi::{sqlite3, sqlite3_api_routines, sqlite3_auto_extension};
use rusqlite::{params, Connection, OptionalExtension};
use sqlite_vec::sqlite3_vec_init;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use super::embedder::Embedder;
use super::error::{MemoryError, MemoryResult};
use super::store::{
    validate_collection, validate_filter, Document, Metadata, MetadataFilter, ScoredDocument,
    VectorStore,
};

/// Metadata field mirrored into the vector table's partition key
pub const PARTITION_FIELD: &str = "conversation_id";

/// Largest `k` sqlite-vec accepts in a KNN query
const MAX_KNN: usize = 4096;

static VEC_EXTENSION: Once = Once::new();

type ExtensionInit =
    unsafe extern "C" fn(*mut sqlite3, *mut *mut c_char, *const sqlite3_api_routines) -> c_int;

/// Register sqlite-vec for every connection opened afterwards
fn register_vec_extension() {
    VEC_EXTENSION.call_once(|| unsafe {
        sqlite3_auto_extension(Some(std::mem::transmute::<*const (), ExtensionInit>(
            sqlite3_vec_init as *const (),
        )));
    });
}

pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqliteVectorStore {
    /// Open (or create) the database at `path` and make sure the collection
    /// tables exist. Missing parent directories are created.
    ///
    /// # Errors
    /// Returns an error if the collection name is invalid or the database
    /// cannot be opened.
    pub fn open(
        path: impl AsRef<Path>,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> MemoryResult<Self> {
        validate_collection(collection)?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        register_vec_extension();
        let conn = Connection::open(path)?;
        // PRAGMA journal_mode returns a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Self::init(conn, collection, embedder)
    }

    /// Non-persistent database, mostly for tests
    pub fn open_in_memory(collection: &str, embedder: Arc<dyn Embedder>) -> MemoryResult<Self> {
        validate_collection(collection)?;
        register_vec_extension();
        Self::init(Connection::open_in_memory()?, collection, embedder)
    }

    fn init(
        conn: Connection,
        collection: &str,
        embedder: Arc<dyn Embedder>,
    ) -> MemoryResult<Self> {
        let dimensions = embedder.dimensions();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {collection} (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{collection}_conversation
                ON {collection} (json_extract(metadata, '$.{PARTITION_FIELD}'));
            CREATE VIRTUAL TABLE IF NOT EXISTS {collection}_vectors USING vec0(
                id TEXT PRIMARY KEY,
                {PARTITION_FIELD} TEXT partition key,
                embedding float[{dimensions}] distance_metric=cosine
            );"
        ))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: collection.to_string(),
            embedder,
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> MemoryResult<T>
    where
        F: FnOnce(&mut Connection) -> MemoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| MemoryError::LockPoisoned)?;
            f(&mut guard)
        })
        .await?
    }

    /// Embed on the blocking pool; model inference is CPU bound
    async fn embed(&self, texts: Vec<String>) -> MemoryResult<Vec<Vec<f32>>> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_batch(&texts)).await?
    }
}

/// sqlite-vec reads float vectors as packed little-endian `f32` blobs
fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

struct StoredRow {
    id: String,
    document: String,
    metadata: String,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            document: row.get(1)?,
            metadata: row.get(2)?,
        })
    }

    fn into_document(self) -> MemoryResult<Document> {
        let metadata: Metadata = serde_json::from_str(&self.metadata)?;
        Ok(Document {
            id: self.id,
            content: self.document,
            metadata,
        })
    }
}

fn select_filtered(
    conn: &Connection,
    table: &str,
    filter: &MetadataFilter,
) -> MemoryResult<Vec<StoredRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, document, metadata FROM {table}
         WHERE json_extract(metadata, '$.{}') = ?1
         ORDER BY rowid",
        filter.field
    ))?;
    let rows = stmt
        .query_map(params![filter.value], StoredRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn nearest(
    conn: &Connection,
    table: &str,
    query: &[u8],
    k: usize,
    filter: Option<&MetadataFilter>,
) -> MemoryResult<Vec<(StoredRow, f64)>> {
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(StoredRow, f64)> {
        Ok((StoredRow::from_row(row)?, row.get(3)?))
    };
    let k = k.min(MAX_KNN) as i64;

    let rows = match filter {
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT c.id, c.document, c.metadata, knn.distance
                 FROM (
                     SELECT id, distance FROM {table}_vectors
                     WHERE embedding MATCH ?1 AND k = ?2
                 ) AS knn
                 JOIN {table} AS c ON c.id = knn.id
                 ORDER BY knn.distance"
            ))?;
            let rows = stmt
                .query_map(params![query, k], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        Some(filter) if filter.field == PARTITION_FIELD => {
            let mut stmt = conn.prepare(&format!(
                "SELECT c.id, c.document, c.metadata, knn.distance
                 FROM (
                     SELECT id, distance FROM {table}_vectors
                     WHERE embedding MATCH ?1 AND k = ?2 AND {PARTITION_FIELD} = ?3
                 ) AS knn
                 JOIN {table} AS c ON c.id = knn.id
                 ORDER BY knn.distance"
            ))?;
            let rows = stmt
                .query_map(params![query, k, filter.value], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        // Fields outside the partition key are scored directly over the
        // matching rows.
        Some(filter) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT c.id, c.document, c.metadata,
                        vec_distance_cosine(v.embedding, ?1) AS distance
                 FROM {table} AS c
                 JOIN {table}_vectors AS v ON v.id = c.id
                 WHERE json_extract(c.metadata, '$.{}') = ?3
                 ORDER BY distance
                 LIMIT ?2",
                filter.field
            ))?;
            let rows = stmt
                .query_map(params![query, k, filter.value], map_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add(&self, documents: Vec<Document>) -> MemoryResult<()> {
        if let Some(document) = documents.iter().find(|d| d.id.is_empty()) {
            return Err(MemoryError::InvalidDocument(format!(
                "empty id for '{}'",
                document.content
            )));
        }
        let texts = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embed(texts).await?;

        let mut rows = Vec::with_capacity(documents.len());
        for (document, embedding) in documents.into_iter().zip(embeddings) {
            let metadata = serde_json::to_string(&document.metadata)?;
            let partition = document
                .metadata
                .get(PARTITION_FIELD)
                .cloned()
                .unwrap_or_default();
            rows.push((
                document.id,
                document.content,
                metadata,
                partition,
                encode_embedding(&embedding),
            ));
        }

        let table = self.table.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut exists = tx.prepare(&format!("SELECT 1 FROM {table} WHERE id = ?1"))?;
                let mut insert = tx.prepare(&format!(
                    "INSERT INTO {table} (id, document, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4)"
                ))?;
                let mut insert_vector = tx.prepare(&format!(
                    "INSERT INTO {table}_vectors (id, {PARTITION_FIELD}, embedding)
                     VALUES (?1, ?2, ?3)"
                ))?;
                for (id, content, metadata, partition, embedding) in &rows {
                    let found: Option<i64> = exists
                        .query_row(params![id], |row| row.get(0))
                        .optional()?;
                    if found.is_some() {
                        return Err(MemoryError::DuplicateId(id.clone()));
                    }
                    insert.execute(params![
                        id,
                        content,
                        metadata,
                        chrono::Utc::now().to_rfc3339()
                    ])?;
                    insert_vector.execute(params![id, partition, embedding])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn query(
        &self,
        text: &str,
        k: usize,
        filter: Option<MetadataFilter>,
    ) -> MemoryResult<Vec<ScoredDocument>> {
        if let Some(filter) = &filter {
            validate_filter(filter)?;
        }
        if k == 0 {
            return Ok(Vec::new());
        }
        let query = self
            .embed(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| MemoryError::Embedding("no embedding generated".to_string()))?;
        let query = encode_embedding(&query);

        let table = self.table.clone();
        let rows = self
            .with_conn(move |conn| nearest(conn, &table, &query, k, filter.as_ref()))
            .await?;

        rows.into_iter()
            .map(|(row, distance)| {
                Ok(ScoredDocument {
                    document: row.into_document()?,
                    score: (1.0 - distance) as f32,
                })
            })
            .collect()
    }

    async fn get(&self, filter: MetadataFilter) -> MemoryResult<Vec<Document>> {
        validate_filter(&filter)?;
        let table = self.table.clone();
        let rows = self
            .with_conn(move |conn| select_filtered(conn, &table, &filter))
            .await?;

        rows.into_iter().map(StoredRow::into_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::embedder::testing::KeywordEmbedder;

    fn doc(id: &str, content: &str, conversation_id: &str, role: &str) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("conversation_id".to_string(), conversation_id.to_string());
        metadata.insert("role".to_string(), role.to_string());
        Document {
            id: id.to_string(),
            content: content.to_string(),
            metadata,
        }
    }

    fn store() -> SqliteVectorStore {
        SqliteVectorStore::open_in_memory("history", Arc::new(KeywordEmbedder)).unwrap()
    }

    #[test]
    fn test_embedding_blob_layout() {
        let bytes = encode_embedding(&[0.5f32, -1.25, 3.0]);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &0.5f32.to_le_bytes());
    }

    #[test]
    fn test_rejects_invalid_collection() {
        let err =
            SqliteVectorStore::open_in_memory("history; DROP", Arc::new(KeywordEmbedder))
                .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidCollection(_)));
    }

    #[tokio::test]
    async fn test_add_and_get_in_order() {
        let store = store();
        store
            .add(vec![
                doc("1", "hello", "a", "user"),
                doc("2", "hi there", "a", "assistant"),
                doc("3", "unrelated", "b", "user"),
            ])
            .await
            .unwrap();

        let docs = store.get(MetadataFilter::eq("conversation_id", "a")).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "hello");
        assert_eq!(docs[1].metadata.get("role").map(String::as_str), Some("assistant"));
    }

    #[tokio::test]
    async fn test_duplicate_id_rolls_back_batch() {
        let store = store();
        store.add(vec![doc("1", "first", "a", "user")]).await.unwrap();

        let err = store
            .add(vec![doc("2", "second", "a", "user"), doc("1", "again", "a", "user")])
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::DuplicateId(id) if id == "1"));

        let docs = store.get(MetadataFilter::eq("conversation_id", "a")).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(store.query("second", 5, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let err = store().add(vec![doc("", "x", "a", "user")]).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn test_query_scoped_and_ranked() {
        let store = store();
        store
            .add(vec![
                doc("1", "the weather is sunny today", "a", "user"),
                doc("2", "rust borrow checker rules", "a", "user"),
                doc("3", "rust borrow checker rules", "b", "user"),
            ])
            .await
            .unwrap();

        let results = store
            .query("rust borrow checker", 5, Some(MetadataFilter::eq("conversation_id", "a")))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "2");
        assert!(results[0].score > results[1].score);

        assert!(store.query("anything", 0, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scoped_knn_not_crowded_out_by_other_conversations() {
        let store = store();
        let crowd: Vec<_> = (0..20)
            .map(|i| doc(&format!("b{i}"), "rust borrow checker rules", "b", "user"))
            .collect();
        store.add(crowd).await.unwrap();
        store.add(vec![doc("a1", "my garden has tomatoes", "a", "user")]).await.unwrap();

        let results = store
            .query("rust borrow checker", 1, Some(MetadataFilter::eq("conversation_id", "a")))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "a1");
    }

    #[tokio::test]
    async fn test_query_filtered_on_other_field() {
        let store = store();
        store
            .add(vec![
                doc("1", "rust borrow checker", "a", "user"),
                doc("2", "rust borrow checker", "a", "assistant"),
                doc("3", "sunny weather", "a", "assistant"),
            ])
            .await
            .unwrap();

        let results = store
            .query("borrow checker", 5, Some(MetadataFilter::eq("role", "assistant")))
            .await
            .unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_rejects_invalid_filter_field() {
        let err = store()
            .get(MetadataFilter::eq("conversation_id') OR 1=1 --", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memory.sqlite3");

        {
            let store = SqliteVectorStore::open(&path, "history", Arc::new(KeywordEmbedder))
                .unwrap();
            store.add(vec![doc("1", "remember me", "a", "user")]).await.unwrap();
        }

        let store = SqliteVectorStore::open(&path, "history", Arc::new(KeywordEmbedder)).unwrap();
        let docs = store.get(MetadataFilter::eq("conversation_id", "a")).await.unwrap();
        assert_eq!(docs.len(), 1);
        let hits = store
            .query("remember", 1, Some(MetadataFilter::eq("conversation_id", "a")))
            .await
            .unwrap();
        assert_eq!(hits[0].document.content, "remember me");
    }
}
