//! HTTP handlers module
//!
//! This module contains the API handlers organized by resource:
//! - Catalog handlers for products, categories, ingredients and company
//! - Promotion, order and account handlers
//! - Token handlers for login and refresh

pub mod access;
pub mod auth;
pub mod catalog;
pub mod orders;
pub mod payload;
pub mod promotions;
pub mod users;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::database::health_check;
use crate::middleware::http_trace_layer;
use crate::state::AppState;
use crate::translation::schema::EntityKind;

pub use access::{authorize, Operation, OperationSpec, Resource};
pub use payload::Payload;

/// Headroom for form fields sent alongside an upload
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT_LANGUAGE])
}

/// All API routes, without state
pub fn api_routes() -> Router<AppState> {
    let catalog = EntityKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| router.merge(catalog::routes(kind)));

    Router::new()
        .route("/health", get(handle_health))
        .merge(catalog)
        .merge(promotions::routes())
        .merge(orders::routes())
        .merge(users::routes())
        .merge(auth::routes())
}

/// The full application: API under `/api`, uploaded media under the media prefix
pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();
    let media_prefix = format!("/{}", settings.media.url_prefix.trim_matches('/'));
    info!(media_prefix = %media_prefix, media_root = %settings.media.root, "Serving uploaded media");

    Router::new()
        .nest("/api", api_routes())
        .nest_service(&media_prefix, ServeDir::new(&settings.media.root))
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(settings.media.max_upload_bytes + FORM_OVERHEAD_BYTES))
        .layer(cors_layer(&settings.server))
        .layer(http_trace_layer())
        .with_state(state)
}

/// Handle `GET /api/health`
pub async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "ok", "version": crate::VERSION })),
        ),
        Err(error) => {
            warn!(error = %error, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable", "version": crate::VERSION })),
            )
        }
    }
}

async fn handle_not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." })))
}
