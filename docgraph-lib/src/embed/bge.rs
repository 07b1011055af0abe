use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::{Embedding, EmbeddingProvider};
use crate::{Error, Result};

const MODEL_NAME: &str = "BAAI/bge-large-en-v1.5";
const DIMENSION: usize = 1024;
const QUERY_PREFIX: &str = "Represent this sentence for searching relevant passages: ";

/// BGE embedder using BAAI/bge-large-en-v1.5.
///
/// Uses fastembed for ONNX-based inference. This model produces 1024-dimensional
/// embeddings and supports up to 512 tokens per input. Inference is blocking,
/// so every call runs on tokio's blocking pool.
pub struct BgeEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl BgeEmbedder {
    /// Create a new BGE embedder.
    ///
    /// Downloads the model on first use (~1.2GB).
    pub fn new() -> Result<Self> {
        let opts = InitOptions::new(EmbeddingModel::BGELargeENV15)
            .with_show_download_progress(true);

        TextEmbedding::try_new(opts)
            .map(|model| Self {
                model: Arc::new(Mutex::new(model)),
            })
            .map_err(|e| Error::Provider(e.to_string()))
    }

    async fn run(&self, text: String) -> Result<Embedding> {
        let model = Arc::clone(&self.model);

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| Error::Provider("embedding model lock poisoned".to_string()))?;
            model
                .embed(vec![text], None)
                .map_err(|e| Error::Provider(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| Error::Provider("model returned no embeddings".to_string()))
        })
        .await
        .map_err(|e| Error::Provider(format!("embedding task failed: {e}")))?
    }
}

#[async_trait]
impl EmbeddingProvider for BgeEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.run(text.to_string()).await
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        // BGE uses a special prompt prefix for queries to improve retrieval
        self.run(format!("{QUERY_PREFIX}{text}")).await
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}
