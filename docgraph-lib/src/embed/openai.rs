use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embed::{Embedding, EmbeddingProvider};
use crate::{Error, Result};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSION: usize = 1536;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI embedding provider.
///
/// Works with OpenAI's API and any compatible endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
    /// Only sent when configured; models without shortening reject the field.
    requested_dims: Option<usize>,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI provider.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (defaults to "text-embedding-3-small")
    /// * `endpoint` - API endpoint (defaults to "https://api.openai.com/v1")
    /// * `dims` - Embedding dimensions (1536 for text-embedding-3-small). When
    ///   given it is also requested from the API as `dimensions`.
    pub fn new(
        api_key: String,
        model: Option<String>,
        endpoint: Option<String>,
        dims: Option<usize>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dims: dims.unwrap_or(DEFAULT_DIMENSION),
            requested_dims: dims,
        }
    }

    fn request<'a>(&'a self, text: &'a str) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.model,
            input: vec![text],
            dimensions: self.requested_dims,
        }
    }

    /// Rejects vectors whose length differs from the configured dimension.
    fn check_dimension(&self, embedding: Embedding) -> Result<Embedding> {
        if embedding.len() != self.dims {
            return Err(Error::Provider(format!(
                "{} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dims
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let url = format!("{}/embeddings", self.endpoint);
        let request = self.request(text);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("OpenAI API error {status}: {body}")));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed embedding response: {e}")))?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Provider("empty response from OpenAI".to_string()))?;
        self.check_dimension(embedding)
    }

    fn dimension(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
