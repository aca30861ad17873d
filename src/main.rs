use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayfinder::cache::{KvCache, MemoryCacheService, RedisCacheService};
use wayfinder::config::Config;
use wayfinder::constants::DEFAULT_MEMORY_CACHE_MAX_ENTRIES;
use wayfinder::db::{PgPoiRepository, PoiRepository};
use wayfinder::services::embedding::EmbeddingClient;
use wayfinder::services::orchestrator::RoutePlanningService;
use wayfinder::services::semantic::SemanticCandidateSource;
use wayfinder::services::spatial::SpatialCandidateSource;
use wayfinder::services::substitution::SubstitutionService;
use wayfinder::services::user_routes::UserRouteStore;
use wayfinder::services::vector_index::VectorIndexClient;
use wayfinder::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfinder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting wayfinder API server");

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = wayfinder::db::create_pool(&config.database_url).await?;
    tracing::info!("Database connection established");

    // Initialize the shared cache: try Redis, fall back to in-memory
    let cache: Arc<dyn KvCache> = if let Some(ref redis_url) = config.redis_url {
        tracing::info!("Connecting to Redis cache...");
        match RedisCacheService::new(redis_url).await {
            Ok(redis_cache) => Arc::new(redis_cache),
            Err(e) => {
                tracing::warn!(
                    "Failed to connect to Redis: {}. Falling back to in-memory cache.",
                    e
                );
                Arc::new(MemoryCacheService::new(
                    DEFAULT_MEMORY_CACHE_MAX_ENTRIES,
                    config.cell_cache_ttl.max(config.user_cache_ttl),
                ))
            }
        }
    } else {
        tracing::info!("Redis URL not configured. Using in-memory cache.");
        Arc::new(MemoryCacheService::new(
            DEFAULT_MEMORY_CACHE_MAX_ENTRIES,
            config.cell_cache_ttl.max(config.user_cache_ttl),
        ))
    };

    // Initialize services
    let poi_repo: Arc<dyn PoiRepository> = Arc::new(PgPoiRepository::new(db_pool.clone()));

    let embedder = EmbeddingClient::new(config.embedding_url.clone());
    let vector_index = VectorIndexClient::new(
        config.vector_index_url.clone(),
        config.vector_collection.clone(),
    );

    let spatial = SpatialCandidateSource::new(
        poi_repo.clone(),
        cache.clone(),
        &config.planner,
        config.cell_cache_ttl,
    )?;
    let semantic = SemanticCandidateSource::new(embedder, vector_index, poi_repo.clone());
    let user_routes = Arc::new(UserRouteStore::new(cache.clone(), config.user_cache_ttl));

    let planner = RoutePlanningService::new(
        spatial,
        semantic,
        poi_repo.clone(),
        user_routes.clone(),
        config.planner.clone(),
    );
    let substitution =
        SubstitutionService::new(user_routes, poi_repo.clone(), config.planner.clone());

    // Create application state
    let state = Arc::new(AppState {
        poi_repo,
        planner,
        substitution,
        cell_cache: cache.clone(),
        user_cache: cache,
    });

    // Build router with CORS and tracing
    let app = Router::new()
        .nest("/api/v1", wayfinder::routes::create_router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
