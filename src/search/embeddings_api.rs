//! Remote embedding provider for OpenAI-compatible `/embeddings` endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{Result, SearchError};
use crate::search::embeddings::Embedder;

const DEFAULT_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Blocking client for a remote embedding API.
pub struct ApiEmbedder {
    url: String,
    model: String,
    api_key: Option<String>,
    dims: usize,
    http_client: reqwest::blocking::Client,
}

impl std::fmt::Debug for ApiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEmbedder")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

impl ApiEmbedder {
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dims: usize,
    ) -> Result<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::Config(format!("HTTP client error: {e}")))?;

        Ok(Self {
            url: url.into(),
            model: model.into(),
            api_key,
            dims,
            http_client,
        })
    }

    /// Build from `[embedding]` config; the key is read from the variable
    /// named by `api_key_env`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let url = config
            .api_url
            .clone()
            .ok_or_else(|| SearchError::MissingConfig("embedding.api_url".to_string()))?;
        let model = config
            .api_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(url, model, api_key, config.dims)
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.http_client.post(&self.url).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| SearchError::EmbeddingFailed(format!("HTTP request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SearchError::EmbeddingFailed(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(SearchError::EmbeddingFailed(format!(
                "embedding API error ({status}): {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&body).map_err(|e| {
            SearchError::EmbeddingFailed(format!("invalid embedding response: {e}"))
        })?;
        if parsed.data.len() != texts.len() {
            return Err(SearchError::EmbeddingFailed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|datum| datum.index);
        let mut out = Vec::with_capacity(parsed.data.len());
        for datum in parsed.data {
            if datum.embedding.len() != self.dims {
                return Err(SearchError::EmbeddingFailed(format!(
                    "expected {} dimensions, got {}",
                    self.dims,
                    datum.embedding.len()
                )));
            }
            out.push(datum.embedding);
        }

        debug!(model = %self.model, inputs = texts.len(), "embedded via API");
        Ok(out)
    }
}

impl Embedder for ApiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])?
            .pop()
            .ok_or_else(|| SearchError::EmbeddingFailed("empty embedding response".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "api"
    }
}
