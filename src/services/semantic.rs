//! Semantic candidate source: one vector search per expanded category,
//! deduplicated to the best similarity per POI, hydrated with full records.

use crate::db::PoiRepository;
use crate::error::Result;
use crate::models::{Poi, PoiCategory};
use crate::services::embedding::EmbeddingClient;
use crate::services::vector_index::VectorIndexClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticTimings {
    pub embedding_ms: u64,
    pub vector_search_ms: u64,
    pub db_hydration_ms: u64,
}

pub struct SemanticCandidateSource {
    embedder: EmbeddingClient,
    index: VectorIndexClient,
    repo: Arc<dyn PoiRepository>,
}

impl SemanticCandidateSource {
    pub fn new(
        embedder: EmbeddingClient,
        index: VectorIndexClient,
        repo: Arc<dyn PoiRepository>,
    ) -> Self {
        SemanticCandidateSource {
            embedder,
            index,
            repo,
        }
    }

    /// Top-k POIs per category by cosine similarity, constrained to
    /// `id_filter` when given. A POI hit by several categories keeps its
    /// best similarity. Hits are hydrated from `prefetched` when possible,
    /// from the store otherwise.
    pub async fn candidates(
        &self,
        categories: &[PoiCategory],
        top_k: usize,
        id_filter: Option<&[String]>,
        prefetched: &HashMap<String, Poi>,
    ) -> Result<(Vec<Poi>, SemanticTimings)> {
        let mut timings = SemanticTimings::default();
        let mut best_score: HashMap<String, f64> = HashMap::new();
        let mut hit_order: Vec<String> = Vec::new();

        for category in categories {
            let query = category.to_string();

            let embed_start = Instant::now();
            let vector = self.embedder.embed_query(&query).await?;
            timings.embedding_ms += embed_start.elapsed().as_millis() as u64;

            let search_start = Instant::now();
            let hits = self.index.search(&vector, top_k, id_filter).await?;
            timings.vector_search_ms += search_start.elapsed().as_millis() as u64;

            tracing::debug!(category = %query, hits = hits.len(), "Semantic search");

            for hit in hits {
                match best_score.get_mut(&hit.id) {
                    Some(existing) => {
                        if hit.score > *existing {
                            *existing = hit.score;
                        }
                    }
                    None => {
                        best_score.insert(hit.id.clone(), hit.score);
                        hit_order.push(hit.id);
                    }
                }
            }
        }

        // Hydrate, preferring records already fetched by the spatial pass.
        let missing: Vec<String> = hit_order
            .iter()
            .filter(|id| !prefetched.contains_key(*id))
            .cloned()
            .collect();

        let hydration_start = Instant::now();
        let mut fetched: HashMap<String, Poi> = if missing.is_empty() {
            HashMap::new()
        } else {
            self.repo
                .find_by_ids(&missing)
                .await?
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect()
        };
        timings.db_hydration_ms += hydration_start.elapsed().as_millis() as u64;

        let mut results = Vec::with_capacity(hit_order.len());
        for id in hit_order {
            let record = prefetched.get(&id).cloned().or_else(|| fetched.remove(&id));
            let Some(mut poi) = record else {
                tracing::warn!("Vector hit {} not found in POI store", id);
                continue;
            };
            poi.similarity = best_score.get(&id).copied();
            results.push(poi);
        }

        results.sort_by(|a, b| {
            b.similarity_score()
                .partial_cmp(&a.similarity_score())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok((results, timings))
    }
}
