use crate::constants::VECTOR_INDEX_TIMEOUT_SECONDS;
use crate::error::{AppError, Result};
use crate::services::{with_retries, UpstreamError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// A nearest-neighbor hit: point id equals POI id, score is cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f64,
}

/// Client for the external vector index (Qdrant REST shape). Point ids equal
/// POI ids; the metric is cosine similarity over the embedding dimension.
#[derive(Clone)]
pub struct VectorIndexClient {
    client: Client,
    base_url: String,
    collection: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<RawPoint>,
}

#[derive(Deserialize)]
struct RawPoint {
    id: serde_json::Value,
    score: f64,
}

impl VectorIndexClient {
    pub fn new(base_url: String, collection: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(VECTOR_INDEX_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_default();

        VectorIndexClient {
            client,
            base_url,
            collection,
        }
    }

    /// Top-k cosine search, optionally constrained to the given point ids.
    pub async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        id_filter: Option<&[String]>,
    ) -> Result<Vec<ScoredPoint>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url.trim_end_matches('/'),
            self.collection
        );

        let filter = id_filter.map(|ids| json!({ "must": [{ "has_id": ids }] }));
        let body = SearchRequest {
            vector,
            limit: top_k,
            with_payload: false,
            filter,
        };

        let points = with_retries("vector index", || async {
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

            let parsed: SearchResponse = response
                .json()
                .await
                .map_err(|e| UpstreamError::Fatal(format!("Failed to parse response: {}", e)))?;
            Ok(parsed.result)
        })
        .await
        .map_err(AppError::VectorIndex)?;

        Ok(points
            .into_iter()
            .map(|p| ScoredPoint {
                id: point_id_string(p.id),
                score: p.score,
            })
            .collect())
    }
}

/// Point ids come back as either strings (uuid) or integers.
fn point_id_string(id: serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
