//! Order handlers

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::access::{authorize_caller, Operation, Resource};
use super::payload::Payload;
use crate::middleware::{MaybePrincipal, RequestLanguage};
use crate::models::pagination::Paginated;
use crate::services::order::{parse_status, OrderDetail, OrderInput, OrderSummary};
use crate::state::AppState;
use crate::translation::listing::page_from_params;
use crate::utils::errors::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/", get(handle_list).post(handle_create))
        .route("/orders/:id/", get(handle_retrieve).patch(handle_update_status))
}

/// Handle `GET /orders/`: staff see every order, others their own
pub async fn handle_list(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Paginated<OrderSummary>>> {
    let (_, caller) = authorize_caller(Resource::Orders, Operation::List, principal.as_ref())?;
    let page = page_from_params(&params, &state.settings.pagination)?;
    let orders = state.services.order_service.list(caller, page).await?;
    Ok(Json(Paginated::from_page(orders, page)))
}

/// Handle `POST /orders/`
pub async fn handle_create(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    RequestLanguage(language): RequestLanguage,
    payload: Payload,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let (_, caller) = authorize_caller(Resource::Orders, Operation::Create, principal.as_ref())?;
    let input: OrderInput = payload.parse()?;
    let order = state.services.order_service.create(caller, input, &language).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Handle `GET /orders/{id}/`
pub async fn handle_retrieve(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    RequestLanguage(language): RequestLanguage,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetail>> {
    let (_, caller) = authorize_caller(Resource::Orders, Operation::Retrieve, principal.as_ref())?;
    Ok(Json(state.services.order_service.retrieve(caller, id, &language).await?))
}

/// Handle `PATCH /orders/{id}/`: status changes by staff
pub async fn handle_update_status(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    RequestLanguage(language): RequestLanguage,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<OrderDetail>> {
    let (_, caller) = authorize_caller(Resource::Orders, Operation::PartialUpdate, principal.as_ref())?;
    let status = parse_status(&payload.into_map())?;
    let order = state
        .services
        .order_service
        .update_status(caller, id, status, &language)
        .await?;
    Ok(Json(order))
}
