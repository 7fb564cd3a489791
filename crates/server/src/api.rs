//! JSON API consumed by the Circle frontend.
//!
//! - `GET  /api/recommendations?q=&category=&limit=` ranked products
//! - `GET  /api/friends`                             friends ordered by name
//! - `POST /api/ingest`                              record a friend event and embed it
//! - `GET  /api/debug/vector?q=`                     raw nearest-neighbor matches
//! - `GET  /api/health`                              data readiness flags

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use circle_core::config::AppConfig;
use circle_core::domain::event::EventType;
use circle_core::domain::friend::{Friend, FriendId};
use circle_core::domain::product::ProductId;
use circle_core::recommend::{checked_limit, MAX_LIMIT, MIN_LIMIT};
use circle_core::{
    ApplicationError, EmbeddingProvider, InterfaceError, RecommendationRequest,
    RecommendationResponse, RecommendationService,
};
use circle_db::repositories::{
    EventRepository, FriendRepository, ProductRepository, RepositoryError, SqlEventRepository,
    SqlFriendRepository, SqlProductRepository, SqlVectorStore, VectorRecord, VectorStore,
};
use circle_db::{migrations, ping, recommendation_service, DbPool};

use crate::health;

const DEBUG_MATCH_COUNT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    embedder: Arc<dyn EmbeddingProvider>,
    service: RecommendationService,
    default_limit: usize,
    voyage_enabled: bool,
    voyage_model: String,
}

impl AppState {
    pub fn new(db_pool: DbPool, embedder: Arc<dyn EmbeddingProvider>, config: &AppConfig) -> Self {
        let service = recommendation_service(&db_pool, embedder.clone(), &config.ranking);

        Self {
            db_pool,
            embedder,
            service,
            default_limit: config.ranking.default_limit,
            voyage_enabled: config.embedding.voyage_enabled(),
            voyage_model: config.embedding.voyage_model.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let health_routes = health::router(state.db_pool.clone());

    Router::new()
        .route("/api/recommendations", get(recommendations))
        .route("/api/friends", get(friends))
        .route("/api/ingest", post(ingest))
        .route("/api/debug/vector", get(debug_vector))
        .route("/api/health", get(api_health))
        .with_state(state)
        .merge(health_routes)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    correlation_id: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into(), correlation_id: None }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into(), correlation_id: None }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let interface = error.into_interface(correlation_id.clone());

        let (status, message) = match &interface {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            InterfaceError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            InterfaceError::ServiceUnavailable { message, .. } => {
                warn!(
                    event_name = "api.request.unavailable",
                    correlation_id = %correlation_id,
                    error = %message,
                    "request failed on a dependency"
                );
                (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_owned())
            }
            InterfaceError::Internal { message, .. } => {
                error!(
                    event_name = "api.request.internal_error",
                    correlation_id = %correlation_id,
                    error = %message,
                    "request failed"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_owned())
            }
        };

        Self { status, message, correlation_id: Some(correlation_id) }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.correlation_id {
            Some(correlation_id) => json!({ "error": self.message, "correlationId": correlation_id }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
}

fn parse_limit(raw: Option<&str>, default: usize) -> Result<usize, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(default);
    };
    let limit = raw.parse::<usize>().map_err(|_| {
        ApiError::bad_request(format!("limit must be an integer between {MIN_LIMIT} and {MAX_LIMIT}"))
    })?;
    checked_limit(limit).map_err(|error| ApiError::bad_request(error.to_string()))
}

async fn recommendations(
    Query(query): Query<RecommendationQuery>,
    State(state): State<AppState>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let limit = parse_limit(query.limit.as_deref(), state.default_limit)?;

    let mut request = RecommendationRequest::new();
    request.query = query.q;
    request.category = query.category;
    request.limit = limit;

    let response = state.service.recommend(&request).await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FriendsResponse {
    pub friends: Vec<Friend>,
}

async fn friends(State(state): State<AppState>) -> Result<Json<FriendsResponse>, ApiError> {
    let friends = SqlFriendRepository::new(state.db_pool.clone()).list().await?;
    Ok(Json(FriendsResponse { friends }))
}

// ---------------------------------------------------------------------------
// Ingest
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(alias = "friend_id")]
    pub friend_id: i64,
    #[serde(alias = "product_id")]
    pub product_id: i64,
    #[serde(default, alias = "event_type")]
    pub event_type: Option<String>,
}

async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let friend =
        SqlFriendRepository::new(state.db_pool.clone()).find_by_id(FriendId(body.friend_id)).await?;
    let product = SqlProductRepository::new(state.db_pool.clone())
        .find_by_id(ProductId(body.product_id))
        .await?;
    let (Some(friend), Some(product)) = (friend, product) else {
        return Err(ApiError::not_found("Product or friend not found"));
    };

    let event_type = EventType::parse_or_purchase(body.event_type.as_deref());
    let document = format!("{} {}", product.title, product.description);
    let embedding = state
        .embedder
        .embed_documents(std::slice::from_ref(&document))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApplicationError::Integration("embedding provider returned no vector".into()))?;

    let event_id = SqlEventRepository::new(state.db_pool.clone())
        .insert(friend.id, product.id, event_type, Utc::now())
        .await?;
    SqlVectorStore::new(state.db_pool.clone())
        .upsert(VectorRecord { event_id, embedding, document })
        .await?;

    info!(
        event_name = "ingest.recorded",
        event_id = event_id.0,
        friend_id = friend.id.0,
        product_id = product.id.0,
        event_type = event_type.as_str(),
        "friend event recorded and embedded"
    );

    Ok(Json(json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Debug + health
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DebugVectorQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMatch {
    pub product_id: ProductId,
    pub title: String,
    pub friend_name: String,
    pub event_type: EventType,
    pub distance: Option<f64>,
    pub category: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugVectorResponse {
    pub voyage_enabled: bool,
    pub model: String,
    pub collection_count: i64,
    pub matches: Vec<VectorMatch>,
}

async fn debug_vector(
    Query(query): Query<DebugVectorQuery>,
    State(state): State<AppState>,
) -> Result<Json<DebugVectorResponse>, ApiError> {
    let Some(text) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return Err(ApiError::bad_request("q must not be empty"));
    };

    let embedding = state.embedder.embed_query(text).await?;
    let store = SqlVectorStore::new(state.db_pool.clone());
    let events = VectorStore::nearest(&store, &embedding, DEBUG_MATCH_COUNT).await?;
    let collection_count = store.count().await?;

    let matches = events
        .into_iter()
        .map(|event| VectorMatch {
            product_id: event.product.id,
            title: event.product.title,
            friend_name: event.friend.name,
            event_type: event.event_type,
            distance: event.distance,
            category: event.product.category,
        })
        .collect();

    Ok(Json(DebugVectorResponse {
        voyage_enabled: state.voyage_enabled,
        model: state.voyage_model.clone(),
        collection_count,
        matches,
    }))
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    pub db_connected: bool,
    pub tables_present: bool,
    pub seeded: bool,
    pub vectors_ready: bool,
    pub embedding_mode: &'static str,
}

async fn api_health(State(state): State<AppState>) -> Json<ApiHealth> {
    let pool = &state.db_pool;
    let db_connected = ping(pool).await.is_ok();
    let tables_present =
        db_connected && migrations::required_tables_present(pool).await.unwrap_or(false);

    let (seeded, vectors_ready) = if tables_present {
        let friends = SqlFriendRepository::new(pool.clone()).count().await.unwrap_or(0);
        let vectors = SqlVectorStore::new(pool.clone()).count().await.unwrap_or(0);
        (friends > 0, vectors > 0)
    } else {
        (false, false)
    };

    Json(ApiHealth {
        db_connected,
        tables_present,
        seeded,
        vectors_ready,
        embedding_mode: if state.voyage_enabled { "voyage" } else { "fallback" },
    })
}
