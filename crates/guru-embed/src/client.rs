//! HTTP client for OpenAI-compatible embedding endpoints.
//!
//! Provides batch and single-query embedding via any `/embeddings` endpoint
//! speaking the OpenAI wire format — the hosted API or a local server
//! (point `base_url` at it and match `dimensions` to the model).

use std::future::Future;

use guru_core::{Embedder, EmbeddingConfig, GuruError};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const BATCH_SIZE: usize = 64;
const BATCH_DELAY_MS: u64 = 200;

/// Client for an OpenAI-compatible embedding API.
///
/// # Examples
///
/// ```
/// use guru_embed::EmbeddingClient;
///
/// let client = EmbeddingClient::new("test-key", "text-embedding-3-small", 1536);
/// assert_eq!(client.model(), "text-embedding-3-small");
/// ```
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a new client with the given API key, model, and dimensionality.
    ///
    /// # Examples
    ///
    /// ```
    /// use guru_embed::EmbeddingClient;
    ///
    /// let client = EmbeddingClient::new("my-key", "text-embedding-3-small", 1536);
    /// ```
    pub fn new(api_key: &str, model: &str, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            dimensions,
        }
    }

    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to `OPENAI_API_KEY` env var if no key in config.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Config`] if no API key is available.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guru_core::EmbeddingConfig;
    /// use guru_embed::EmbeddingClient;
    ///
    /// let config = EmbeddingConfig::default();
    /// let client = EmbeddingClient::with_config(&config).unwrap();
    /// ```
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self, GuruError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                GuruError::Config(
                    "embedding API key not found: set embedding.api_key in .guru.toml or OPENAI_API_KEY env var".into(),
                )
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a batch of texts. Returns vectors in the same order.
    ///
    /// Splits into sub-batches of 64 with 200ms delays for rate limiting.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Embedding`] if the API call fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guru_embed::EmbeddingClient;
    ///
    /// # async fn example() {
    /// let client = EmbeddingClient::new("key", "text-embedding-3-small", 1536);
    /// let texts = vec!["Fix GraphQL resolver batching".to_string()];
    /// let embeddings = client.embed_batch(&texts).await.unwrap();
    /// assert_eq!(embeddings.len(), 1);
    /// # }
    /// ```
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GuruError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(BATCH_DELAY_MS)).await;
            }

            let response = self.send_request(batch.to_vec()).await?;
            for item in response.data {
                all_embeddings.push(item.embedding);
            }
        }

        Ok(all_embeddings)
    }

    /// Embed a single query string.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Embedding`] if the API call fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guru_embed::EmbeddingClient;
    ///
    /// # async fn example() {
    /// let client = EmbeddingClient::new("key", "text-embedding-3-small", 1536);
    /// let embedding = client.embed_query("GraphQL N+1 queries").await.unwrap();
    /// assert!(!embedding.is_empty());
    /// # }
    /// ```
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, GuruError> {
        let response = self.send_request(vec![query.to_string()]).await?;

        let first = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GuruError::Embedding("empty response from embedding API".into()))?;

        Ok(first.embedding)
    }

    async fn send_request(&self, input: Vec<String>) -> Result<EmbedResponse, GuruError> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| GuruError::Embedding(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(GuruError::Embedding(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GuruError::Embedding(format!("failed to parse response: {e}")))
    }

    /// Build the JSON request body for an embed call (for testing).
    #[cfg(test)]
    fn build_request(&self, texts: &[String]) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        }
    }
}

impl Embedder for EmbeddingClient {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, GuruError>> + Send {
        self.embed_query(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
