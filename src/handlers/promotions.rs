//! Promotion handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::access::{authorize, Operation, OperationSpec, Resource};
use super::payload::Payload;
use crate::middleware::MaybePrincipal;
use crate::models::promotion::Promotion;
use crate::services::promotion::PROMOTION_MEDIA_FOLDER;
use crate::state::AppState;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/promotions/active/", get(handle_active))
        .route("/promotions/", get(handle_list).post(handle_create))
        .route(
            "/promotions/:id/",
            get(handle_retrieve)
                .put(handle_replace)
                .patch(handle_partial_update)
                .delete(handle_destroy),
        )
}

/// Handle `GET /promotions/active/`: active promotions in display order
pub async fn handle_active(State(state): State<AppState>, principal: MaybePrincipal) -> Result<Json<Vec<Promotion>>> {
    authorize(Resource::ActivePromotions, Operation::List, principal.as_ref())?;
    Ok(Json(state.services.promotion_service.list(true).await?))
}

pub async fn handle_list(State(state): State<AppState>, principal: MaybePrincipal) -> Result<Json<Vec<Promotion>>> {
    authorize(Resource::Promotions, Operation::List, principal.as_ref())?;
    Ok(Json(state.services.promotion_service.list(false).await?))
}

pub async fn handle_retrieve(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<Json<Promotion>> {
    authorize(Resource::Promotions, Operation::Retrieve, principal.as_ref())?;
    Ok(Json(state.services.promotion_service.get(id).await?))
}

pub async fn handle_create(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    payload: Payload,
) -> Result<(StatusCode, Json<Promotion>)> {
    let spec = authorize(Resource::Promotions, Operation::Create, principal.as_ref())?;
    let promotion = write(&state, None, spec, payload).await?;
    Ok((StatusCode::CREATED, Json(promotion)))
}

pub async fn handle_replace(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<Promotion>> {
    let spec = authorize(Resource::Promotions, Operation::Replace, principal.as_ref())?;
    Ok(Json(write(&state, Some(id), spec, payload).await?))
}

pub async fn handle_partial_update(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<Promotion>> {
    let spec = authorize(Resource::Promotions, Operation::PartialUpdate, principal.as_ref())?;
    Ok(Json(write(&state, Some(id), spec, payload).await?))
}

pub async fn handle_destroy(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    authorize(Resource::Promotions, Operation::Destroy, principal.as_ref())?;
    state.services.promotion_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn write(state: &AppState, id: Option<i64>, spec: OperationSpec, mut payload: Payload) -> Result<Promotion> {
    let services = &state.services;
    let stored = payload
        .store_upload(&services.media, "image", PROMOTION_MEDIA_FOLDER)
        .await?;
    let body = payload.into_map();

    let result = match id {
        None => services.promotion_service.create(&body).await,
        Some(id) => services.promotion_service.update(id, &body, spec.write_mode()).await,
    };

    if result.is_err() {
        if let Some(path) = stored {
            services.media.discard(&path).await;
        }
    }
    result
}
