//! Per-user route cache: one entry per user holding the planned routes as
//! ordered (poi_id, category) pairs, the unused alternatives grouped by
//! category, and the ids already swapped out by substitution.

use crate::cache::{user_cache_key, KvCache};
use crate::error::{AppError, Result};
use crate::models::{Poi, PoiCategory, TransportMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutePoiRef {
    pub poi_id: String,
    pub category: PoiCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRouteEntry {
    pub user_id: String,
    pub transportation_mode: TransportMode,
    /// route_id (stringified integer) -> ordered stops
    pub routes: BTreeMap<String, Vec<RoutePoiRef>>,
    /// category -> alternative POI ids not used by any route
    pub available_by_category: BTreeMap<String, Vec<String>>,
    /// category -> POI ids swapped out by substitution; never offered again
    pub substituted_by_category: BTreeMap<String, Vec<String>>,
}

impl UserRouteEntry {
    pub fn new(user_id: Uuid, mode: TransportMode) -> Self {
        UserRouteEntry {
            user_id: user_id.to_string(),
            transportation_mode: mode,
            routes: BTreeMap::new(),
            available_by_category: BTreeMap::new(),
            substituted_by_category: BTreeMap::new(),
        }
    }

    pub fn put_route(&mut self, route_id: u32, stops: Vec<RoutePoiRef>) {
        self.routes.insert(route_id.to_string(), stops);
    }

    /// Union the candidate pool into the availability sets.
    pub fn merge_available(&mut self, pool: &[Poi]) {
        for poi in pool {
            let bucket = self
                .available_by_category
                .entry(poi.category.to_string())
                .or_default();
            if !bucket.contains(&poi.id) {
                bucket.push(poi.id.clone());
            }
        }
    }

    /// Every POI id referenced by any cached route.
    pub fn route_member_ids(&self) -> HashSet<String> {
        self.routes
            .values()
            .flatten()
            .map(|r| r.poi_id.clone())
            .collect()
    }

    pub fn substituted_ids(&self) -> HashSet<String> {
        self.substituted_by_category
            .values()
            .flatten()
            .cloned()
            .collect()
    }

    /// Restore the entry invariants: ids inside routes or already swapped
    /// out never appear in the availability sets.
    pub fn normalize(&mut self) {
        let members = self.route_member_ids();
        let substituted = self.substituted_ids();
        for bucket in self.available_by_category.values_mut() {
            bucket.retain(|id| !members.contains(id) && !substituted.contains(id));
        }
        self.available_by_category.retain(|_, ids| !ids.is_empty());
    }

    /// Index of `poi_id` within a route, if present.
    pub fn position_in_route(&self, route_id: &str, poi_id: &str) -> Option<usize> {
        self.routes
            .get(route_id)?
            .iter()
            .position(|r| r.poi_id == poi_id)
    }

    pub fn mark_substituted(&mut self, category: &PoiCategory, poi_id: String) {
        let bucket = self
            .substituted_by_category
            .entry(category.to_string())
            .or_default();
        if !bucket.contains(&poi_id) {
            bucket.push(poi_id);
        }
    }
}

/// Storage wrapper over the key-value cache; writes carry a fresh TTL and
/// replace the prior entry atomically.
pub struct UserRouteStore {
    cache: Arc<dyn KvCache>,
    ttl_seconds: u64,
}

impl UserRouteStore {
    pub fn new(cache: Arc<dyn KvCache>, ttl_seconds: u64) -> Self {
        UserRouteStore { cache, ttl_seconds }
    }

    pub async fn load(&self, user_id: Uuid) -> Result<Option<UserRouteEntry>> {
        let key = user_cache_key(&user_id.to_string());
        match self.cache.get(&key).await {
            Some(raw) => {
                let entry = serde_json::from_str(&raw)
                    .map_err(|e| AppError::Cache(format!("Corrupt user entry: {}", e)))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Normalizes the entry, then writes it with a renewed lifetime.
    pub async fn save(&self, entry: &mut UserRouteEntry) -> Result<()> {
        entry.normalize();
        let key = user_cache_key(&entry.user_id);
        let raw = serde_json::to_string(entry)
            .map_err(|e| AppError::Cache(format!("Failed to serialize user entry: {}", e)))?;
        self.cache.set_ex(&key, &raw, self.ttl_seconds).await;
        tracing::debug!(user = %entry.user_id, routes = entry.routes.len(), "Saved route cache entry");
        Ok(())
    }

    pub async fn delete(&self, user_id: Uuid) -> bool {
        self.cache.delete(&user_cache_key(&user_id.to_string())).await
    }
}
