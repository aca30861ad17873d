//! Substitution protocol scenarios over the per-user route cache: candidate
//! exclusion, confirm bookkeeping, round-trips and replace-route semantics.

mod common;

use async_trait::async_trait;
use common::{offset_km, poi};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use wayfinder::cache::MemoryCacheService;
use wayfinder::config::PlannerConfig;
use wayfinder::db::PoiRepository;
use wayfinder::error::{AppError, Result};
use wayfinder::models::{
    ConfirmReplaceRequest, Coordinates, Poi, PoiCategory, ReplacePoiRequest, TransportMode,
};
use wayfinder::services::substitution::SubstitutionService;
use wayfinder::services::user_routes::{RoutePoiRef, UserRouteEntry, UserRouteStore};

struct StubRepo {
    pois: HashMap<String, Poi>,
}

#[async_trait]
impl PoiRepository for StubRepo {
    async fn find_in_bbox(
        &self,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Vec<Poi>> {
        Ok(self
            .pois
            .values()
            .filter(|p| (min_lat..=max_lat).contains(&p.lat) && (min_lon..=max_lon).contains(&p.lon))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Poi>> {
        Ok(ids.iter().filter_map(|id| self.pois.get(id).cloned()).collect())
    }

    async fn visited_poi_ids(&self, _user_id: Uuid) -> Result<Vec<String>> {
        Ok(vec![])
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.pois.len() as i64)
    }
}

fn stop(poi_id: &str, category: PoiCategory) -> RoutePoiRef {
    RoutePoiRef {
        poi_id: poi_id.to_string(),
        category,
    }
}

fn sample_pool() -> Vec<Poi> {
    let mk = |id: &str, cat: PoiCategory, n: f64, e: f64| {
        let (lat, lon) = offset_km(n, e);
        poi(id, cat, lat, lon)
    };
    vec![
        mk("A", PoiCategory::Restaurant, 0.5, 0.0),
        mk("B", PoiCategory::CafeBakery, 0.8, 0.5),
        mk("C", PoiCategory::Restaurant, 1.0, 1.0),
        mk("D", PoiCategory::Restaurant, 0.6, 0.1),
        mk("E", PoiCategory::Restaurant, 1.5, 1.5),
    ]
}

async fn setup() -> (SubstitutionService, Arc<UserRouteStore>, Uuid) {
    let cache = Arc::new(MemoryCacheService::new(100, 3600));
    let store = Arc::new(UserRouteStore::new(cache, 3600));
    let repo = Arc::new(StubRepo {
        pois: sample_pool().into_iter().map(|p| (p.id.clone(), p)).collect(),
    });
    let service = SubstitutionService::new(store.clone(), repo, PlannerConfig::default());

    let user_id = Uuid::new_v4();
    let mut entry = UserRouteEntry::new(user_id, TransportMode::Driving);
    entry.put_route(
        1,
        vec![
            stop("A", PoiCategory::Restaurant),
            stop("B", PoiCategory::CafeBakery),
            stop("C", PoiCategory::Restaurant),
        ],
    );
    entry.merge_available(&sample_pool());
    store.save(&mut entry).await.unwrap();

    (service, store, user_id)
}

fn replace_request(user_id: Uuid, old: &str) -> ReplacePoiRequest {
    ReplacePoiRequest {
        user_id,
        route_id: "1".to_string(),
        old_poi_id: old.to_string(),
        user_location: Coordinates::new(common::USER_LAT, common::USER_LON).unwrap(),
        mode: TransportMode::Driving,
        top_k: 5,
        current_time: None,
    }
}

fn confirm(user_id: Uuid, old: &str, new: &str) -> ConfirmReplaceRequest {
    ConfirmReplaceRequest {
        user_id,
        route_id: "1".to_string(),
        old_poi_id: old.to_string(),
        new_poi_id: new.to_string(),
    }
}

/// Route [A, B, C] with available Restaurants {A, C, D, E}: replacing A may
/// only offer D and E.
#[tokio::test]
async fn replacement_pool_excludes_route_members() {
    let (service, _, user_id) = setup().await;

    let candidates = service.replace_poi(&replace_request(user_id, "A")).await.unwrap();
    let mut ids: Vec<&str> = candidates.iter().map(|c| c.poi.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["D", "E"]);
}

#[tokio::test]
async fn confirm_then_reverse_requires_pool_membership() {
    let (service, store, user_id) = setup().await;

    service.confirm_replace(&confirm(user_id, "A", "D")).await.unwrap();

    let entry = store.load(user_id).await.unwrap().unwrap();
    assert_eq!(entry.routes["1"][0].poi_id, "D");
    assert!(entry.substituted_by_category["Restaurant"].contains(&"A".to_string()));

    // Reversing needs A back in the candidate pool, but substituted-out ids
    // never reappear for the same user: the reverse swap must conflict.
    let err = service
        .confirm_replace(&confirm(user_id, "D", "A"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn substituted_ids_stay_out_of_candidate_lists() {
    let (service, _, user_id) = setup().await;

    service.confirm_replace(&confirm(user_id, "A", "D")).await.unwrap();

    let candidates = service.replace_poi(&replace_request(user_id, "D")).await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|c| c.poi.id.as_str()).collect();
    assert_eq!(ids, vec!["E"], "A must not come back after being swapped out");
}

#[tokio::test]
async fn replace_keeps_order_index_and_category() {
    let (service, store, user_id) = setup().await;

    let updated = service.confirm_replace(&confirm(user_id, "C", "E")).await.unwrap();

    assert_eq!(updated.len(), 3);
    assert_eq!(updated[2].poi_id, "E");
    assert_eq!(updated[2].category, PoiCategory::Restaurant);
    // untouched stops keep their slots
    assert_eq!(updated[0].poi_id, "A");
    assert_eq!(updated[1].poi_id, "B");

    let entry = store.load(user_id).await.unwrap().unwrap();
    assert_eq!(entry.position_in_route("1", "E"), Some(2));
}

/// Planning with replace_route=2 swaps only that slot: routes {1, 3} stay,
/// the previous route 2 is discarded, bounding the entry size.
#[tokio::test]
async fn replace_route_discards_prior_route_at_that_id() {
    let cache = Arc::new(MemoryCacheService::new(100, 3600));
    let store = UserRouteStore::new(cache, 3600);

    let user_id = Uuid::new_v4();
    let mut entry = UserRouteEntry::new(user_id, TransportMode::Walking);
    entry.put_route(1, vec![stop("A", PoiCategory::Restaurant)]);
    entry.put_route(2, vec![stop("B", PoiCategory::CafeBakery)]);
    entry.put_route(3, vec![stop("C", PoiCategory::Restaurant)]);
    store.save(&mut entry).await.unwrap();

    // a fresh plan for route 2 overwrites exactly that id
    let mut entry = store.load(user_id).await.unwrap().unwrap();
    entry.put_route(2, vec![stop("D", PoiCategory::Restaurant)]);
    store.save(&mut entry).await.unwrap();

    let entry = store.load(user_id).await.unwrap().unwrap();
    assert_eq!(entry.routes.len(), 3);
    assert_eq!(entry.routes["1"][0].poi_id, "A");
    assert_eq!(entry.routes["2"][0].poi_id, "D");
    assert_eq!(entry.routes["3"][0].poi_id, "C");
    assert!(!entry.route_member_ids().contains("B"));
}

/// delete_cache followed by a fresh plan starts route ids at 1 again.
#[tokio::test]
async fn delete_then_replan_restarts_route_ids() {
    let cache = Arc::new(MemoryCacheService::new(100, 3600));
    let store = UserRouteStore::new(cache, 3600);

    let user_id = Uuid::new_v4();
    let mut entry = UserRouteEntry::new(user_id, TransportMode::Walking);
    entry.put_route(1, vec![stop("A", PoiCategory::Restaurant)]);
    entry.put_route(2, vec![stop("B", PoiCategory::CafeBakery)]);
    store.save(&mut entry).await.unwrap();

    assert!(store.delete(user_id).await);
    assert!(store.load(user_id).await.unwrap().is_none());

    let mut fresh = UserRouteEntry::new(user_id, TransportMode::Walking);
    fresh.put_route(1, vec![stop("C", PoiCategory::Restaurant)]);
    store.save(&mut fresh).await.unwrap();

    let entry = store.load(user_id).await.unwrap().unwrap();
    let ids: Vec<&String> = entry.routes.keys().collect();
    assert_eq!(ids, vec!["1"]);
}
