//! OpenAI-compatible embedding client.

use super::Embedder;
use crate::llm::{LlmHttpConfig, build_http_client};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Embedding client for the OpenAI `/v1/embeddings` API shape.
///
/// Works against any OpenAI-compatible endpoint (set `with_endpoint` for
/// self-hosted gateways).
pub struct OpenAiEmbedder {
    /// API key.
    api_key: Option<String>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// Vector dimensionality the model produces.
    dimensions: usize,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OpenAiEmbedder {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "text-embedding-3-small";

    /// Default dimensionality of the default model.
    pub const DEFAULT_DIMENSIONS: usize = 1536;

    /// Creates a new embedding client from environment defaults.
    #[must_use]
    pub fn new() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            dimensions: Self::DEFAULT_DIMENSIONS,
            client: build_http_client(LlmHttpConfig::from_env()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the expected vector dimensionality.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Sets HTTP client timeouts for embedding requests.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::OperationFailed {
                operation: "embedding_request".to_string(),
                cause: "OPENAI_API_KEY not set".to_string(),
            })?;

        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.iter().map(ToString::to_string).collect(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connect"
                } else {
                    "request"
                };
                tracing::error!(
                    provider = "openai",
                    model = %self.model,
                    error = %e,
                    error_kind = error_kind,
                    "embedding request failed"
                );
                Error::OperationFailed {
                    operation: "embedding_request".to_string(),
                    cause: format!("{error_kind} error: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                provider = "openai",
                model = %self.model,
                status = %status,
                body = %body,
                "embedding API returned error status"
            );
            return Err(Error::OperationFailed {
                operation: "embedding_request".to_string(),
                cause: format!("API returned status: {status} - {body}"),
            });
        }

        let response: EmbeddingResponse = response.json().map_err(|e| {
            tracing::error!(provider = "openai", error = %e, "failed to parse embedding response");
            Error::OperationFailed {
                operation: "embedding_response".to_string(),
                cause: e.to_string(),
            }
        })?;

        let mut data = response.data;
        // index field defines the order; the API may not preserve input order
        data.sort_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

impl Default for OpenAiEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text])?;
        vectors.pop().ok_or_else(|| Error::OperationFailed {
            operation: "embedding_response".to_string(),
            cause: "provider returned no vectors".to_string(),
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }
}

/// Request to the embeddings API.
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

/// Response from the embeddings API.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

/// One embedding in the response.
#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_configuration() {
        let client = OpenAiEmbedder::new()
            .with_endpoint("http://localhost:8080/v1")
            .with_model("nomic-embed-text")
            .with_dimensions(768);

        assert_eq!(client.endpoint, "http://localhost:8080/v1");
        assert_eq!(client.model, "nomic-embed-text");
        assert_eq!(client.dimensions(), 768);
    }

    #[test]
    fn test_missing_api_key_errors() {
        let client = OpenAiEmbedder {
            api_key: None,
            endpoint: OpenAiEmbedder::DEFAULT_ENDPOINT.to_string(),
            model: OpenAiEmbedder::DEFAULT_MODEL.to_string(),
            dimensions: OpenAiEmbedder::DEFAULT_DIMENSIONS,
            client: reqwest::blocking::Client::new(),
        };
        assert!(client.embed("text").is_err());
    }

    #[test]
    fn test_empty_batch_short_circuits() {
        let client = OpenAiEmbedder {
            api_key: None,
            endpoint: OpenAiEmbedder::DEFAULT_ENDPOINT.to_string(),
            model: OpenAiEmbedder::DEFAULT_MODEL.to_string(),
            dimensions: OpenAiEmbedder::DEFAULT_DIMENSIONS,
            client: reqwest::blocking::Client::new(),
        };
        // no API key needed when there is nothing to embed
        assert!(client.embed_batch(&[]).unwrap().is_empty());
    }
}
