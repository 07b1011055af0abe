//! Configuration
//!
//! Everything is optional: a missing file, a missing section or a missing key
//! all fall back to the defaults below.
//!
//! ```toml
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//!
//! [sources]
//! crates = ["tokio", "serde"]
//! fetch_chapters = true
//!
//! [search]
//! limit = 10
//! min_score = 0.3
//!
//! [indexing]
//! concurrency = 8
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub sources: SourcesConfig,
    pub search: SearchConfig,
    pub indexing: IndexingConfig,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` when given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local BAAI/bge-large-en-v1.5 through fastembed
    #[default]
    Bge,
    /// OpenAI-compatible HTTP embeddings endpoint
    OpenAi,
}

/// Embedding provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    /// Model name; `None` picks the provider's default
    pub model: Option<String>,
    /// API base url for HTTP providers
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Output dimension; `None` picks the provider's default
    pub dimension: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Bge,
            model: None,
            endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimension: None,
        }
    }
}

/// Documentation sources to scrape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub docs_url: String,
    pub std_url: String,
    pub crates_url: String,
    /// Crates indexed by a full run
    pub crates: Vec<String>,
    /// Fetch every book chapter's page instead of indexing titles only
    pub fetch_chapters: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            docs_url: "https://doc.rust-lang.org".to_string(),
            std_url: "https://doc.rust-lang.org/std/".to_string(),
            crates_url: "https://crates.io".to_string(),
            crates: ["tokio", "serde", "rand", "reqwest", "actix-web"]
                .into_iter()
                .map(String::from)
                .collect(),
            fetch_chapters: false,
        }
    }
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub limit: usize,
    /// Neighbours fetched during the similarity step of related-document lookups
    pub related_limit: usize,
    pub min_score: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            related_limit: 5,
            min_score: None,
        }
    }
}

/// Bulk indexing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Documents indexed at the same time
    pub concurrency: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}
