//! Token handlers

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::access::{authorize, Operation, Resource};
use super::payload::{parse_body, require_fields, Payload};
use crate::services::auth::TokenPair;
use crate::state::AppState;
use crate::utils::errors::Result;

#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/token/", post(handle_token))
        .route("/token/refresh/", post(handle_refresh))
}

/// Handle `POST /token/`: exchange credentials for an access and refresh token
///
/// Bearer headers are ignored here. Attempts are throttled per username
/// before credentials are checked.
pub async fn handle_token(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<TokenPair>> {
    authorize(Resource::Tokens, Operation::Create, None)?;

    let body = payload.into_map();
    require_fields(&body, &["username", "password"])?;
    let credentials: Credentials = parse_body(body)?;

    state.login_limiter.check_rate_limit(&credentials.username)?;
    let pair = state
        .services
        .auth_service
        .login(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(pair))
}

/// Handle `POST /token/refresh/`
pub async fn handle_refresh(
    State(state): State<AppState>,
    payload: Payload,
) -> Result<Json<Value>> {
    authorize(Resource::Tokens, Operation::Create, None)?;

    let body = payload.into_map();
    require_fields(&body, &["refresh"])?;
    let request: RefreshRequest = parse_body(body)?;

    let access = state.services.auth_service.refresh(&request.refresh).await?;
    Ok(Json(json!({ "access": access })))
}
