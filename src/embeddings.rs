use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::EmbeddingConfig;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Request failed: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Client for the embedding capability, used by the semantic memory layer.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single text into a vector of `dimension()` floats.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text_body = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!(%status, "embedding backend returned error");
            return Err(Error::Embedding(format!(
                "Backend returned {}: {}",
                status, text_body
            )));
        }

        let parsed: EmbedResponse = serde_json::from_str(&text_body)
            .map_err(|e| Error::Embedding(format!("Unexpected response shape: {}", e)))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Embedding("Empty embedding response".into()))?;

        if vector.len() != self.dimension {
            warn!(
                got = vector.len(),
                expected = self.dimension,
                "embedding dimension mismatch"
            );
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_first_vector() {
        let raw = r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"text-embedding-3-small"}"#;
        let parsed: EmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }
}
