//! Text embedding used by the vector stores.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;

use super::error::{MemoryError, MemoryResult};

/// Output size of all-MiniLM-L6-v2
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Turns text into a fixed-size vector.
///
/// Implementations are blocking; stores call them from the blocking pool.
pub trait Embedder: Send + Sync {
    /// # Errors
    /// Returns an error if the text cannot be embedded.
    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> MemoryResult<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dimensions(&self) -> usize;
}

/// Local sentence embeddings from all-MiniLM-L6-v2 via fastembed.
///
/// The ONNX model is fetched into the cache directory on first use.
pub struct MiniLmEmbedder {
    model: Mutex<TextEmbedding>,
}

impl MiniLmEmbedder {
    /// # Errors
    /// Returns an error if the model cannot be downloaded or loaded.
    pub fn new(cache_dir: Option<PathBuf>) -> MemoryResult<Self> {
        let mut options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| MemoryError::Embedding(format!("failed to load model: {e}")))?;
        info!(
            model = "all-MiniLM-L6-v2",
            dimension = DEFAULT_DIMENSIONS,
            "Embeddings enabled"
        );

        Ok(Self {
            model: Mutex::new(model),
        })
    }

    fn ensure_dimension(embedding: &[f32]) -> MemoryResult<()> {
        if embedding.len() != DEFAULT_DIMENSIONS {
            return Err(MemoryError::Embedding(format!(
                "embedding dimension mismatch: expected {}, got {}",
                DEFAULT_DIMENSIONS,
                embedding.len()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MiniLmEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbedder")
            .field("dimensions", &DEFAULT_DIMENSIONS)
            .finish_non_exhaustive()
    }
}

impl Embedder for MiniLmEmbedder {
    fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| MemoryError::Embedding("no embedding generated".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> MemoryResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.lock().map_err(|_| MemoryError::LockPoisoned)?;
        let embeddings = model
            .embed(texts.to_vec(), None)
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        for embedding in &embeddings {
            Self::ensure_dimension(embedding)?;
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        DEFAULT_DIMENSIONS
    }
}

/// Deterministic bag-of-words embedder for unit tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    #[derive(Debug, Default)]
    pub(crate) struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
            let mut vector = vec![0.0f32; DEFAULT_DIMENSIONS];
            // Keeps empty text away from the zero vector
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
}
