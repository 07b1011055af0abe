//! Text embedding providers
//!
//! Two backends are available:
//!
//! - [`BgeEmbedder`]: BAAI/bge-large-en-v1.5 run locally via the fastembed
//!   crate (ONNX runtime), 1024 dimensions.
//! - [`OpenAiEmbedder`]: any OpenAI-compatible `/embeddings` endpoint,
//!   `text-embedding-3-small` (1536 dimensions) by default.
//!
//! The dimension is fixed per deployment and must match whatever the vector
//! store already holds.
//!
//! # Usage
//!
//! ```ignore
//! use docgraph_lib::{config::EmbeddingConfig, embed};
//!
//! let provider = embed::from_config(&EmbeddingConfig::default())?;
//!
//! let doc_embedding = provider.embed("An Option<T> type").await?;
//! let query_embedding = provider.embed_query("how do I handle missing values?").await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingConfig, ProviderKind};
use crate::{Error, Result};

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed document text for indexing
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a query for searching
    ///
    /// Note: Some models (like BGE) use different prompts for queries vs documents.
    /// Defaults to [`embed`](Self::embed); such providers override it.
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed(text).await
    }

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

/// Build the provider selected by `config`.
///
/// The OpenAI key is read from the environment variable named by
/// `config.api_key_env`.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        ProviderKind::Bge => Ok(Arc::new(BgeEmbedder::new()?)),
        ProviderKind::OpenAi => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                Error::Config(format!(
                    "OpenAI provider selected but ${} is not set",
                    config.api_key_env
                ))
            })?;
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                config.model.clone(),
                config.endpoint.clone(),
                config.dimension,
            )))
        }
    }
}

mod bge;
mod openai;

pub use bge::*;
pub use openai::*;
