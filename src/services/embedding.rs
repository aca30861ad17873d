use crate::constants::EMBEDDING_TIMEOUT_SECONDS;
use crate::error::{AppError, Result};
use crate::services::{with_retries, UpstreamError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for asymmetric embedding models (e5-style): queries and documents
/// are embedded with different markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Query,
    Passage,
}

impl TextKind {
    fn prefix(&self) -> &'static str {
        match self {
            TextKind::Query => "query",
            TextKind::Passage => "passage",
        }
    }
}

/// Client for the external embedding service. Takes one or more strings and
/// returns unit-norm vectors of the configured dimension.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    prefix: &'static str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(EMBEDDING_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_default();

        EmbeddingClient { client, base_url }
    }

    /// Embed a batch of texts with the asymmetric prefix for `kind`.
    pub async fn embed(&self, texts: &[String], kind: TextKind) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embed", self.base_url.trim_end_matches('/'));
        let body = EmbedRequest {
            texts,
            prefix: kind.prefix(),
        };

        let embeddings = with_retries("embedding", || async {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| UpstreamError::Transient(format!("Request failed: {}", e)))?;

            let status = response.status();
            if status.is_server_error() {
                return Err(UpstreamError::Transient(format!("HTTP {}", status)));
            }
            if !status.is_success() {
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(UpstreamError::Fatal(format!("HTTP {}: {}", status, text)));
            }

            let parsed: EmbedResponse = response
                .json()
                .await
                .map_err(|e| UpstreamError::Fatal(format!("Failed to parse response: {}", e)))?;
            Ok(parsed.embeddings)
        })
        .await
        .map_err(AppError::Embedding)?;

        if embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()], TextKind::Query).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Embedding("Empty embedding response".to_string()))
    }
}
