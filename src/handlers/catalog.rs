//! Catalog handlers
//!
//! One set of handlers serves products, categories, ingredients and
//! company; the entity kind is attached to each route group as an
//! extension.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::Value;
use tracing::debug;

use super::access::{authorize, Operation, OperationSpec, Resource};
use super::payload::Payload;
use crate::middleware::MaybePrincipal;
use crate::models::pagination::{Page, Paginated};
use crate::state::AppState;
use crate::translation::listing::ListQuery;
use crate::translation::schema::EntityKind;
use crate::utils::errors::Result;

/// URL segment of an entity collection
pub fn collection_segment(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Product => "products",
        EntityKind::Category => "categories",
        EntityKind::Ingredient => "ingredients",
        EntityKind::Company => "company",
    }
}

/// Routes for one entity kind
pub fn routes(kind: EntityKind) -> Router<AppState> {
    let segment = collection_segment(kind);
    Router::new()
        .route(&format!("/{}/", segment), get(handle_list).post(handle_create))
        .route(
            &format!("/{}/:id/", segment),
            get(handle_retrieve)
                .put(handle_replace)
                .patch(handle_partial_update)
                .delete(handle_destroy),
        )
        .layer(Extension(kind))
}

/// Handle `GET /{collection}/`
pub async fn handle_list(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    principal: MaybePrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Paginated<Value>>> {
    let spec = authorize(Resource::Catalog, Operation::List, principal.as_ref())?;
    let query = ListQuery::from_params(kind.schema(), &params, &state.settings.pagination)?;

    let catalog = &state.services.catalog_service;
    let page = catalog.list(kind, &query).await?;
    let results = catalog.represent_many(&page.items, spec.output).await?;

    debug!(entity = %kind, count = page.count, returned = results.len(), "Listed entities");
    Ok(Json(Paginated::from_page(Page::new(page.count, results), query.page)))
}

/// Handle `GET /{collection}/{id}/`
pub async fn handle_retrieve(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let spec = authorize(Resource::Catalog, Operation::Retrieve, principal.as_ref())?;
    let catalog = &state.services.catalog_service;
    let record = catalog.retrieve(kind, id).await?;
    Ok(Json(catalog.represent(&record, spec.output).await?))
}

/// Handle `POST /{collection}/`
pub async fn handle_create(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    principal: MaybePrincipal,
    payload: Payload,
) -> Result<(StatusCode, Json<Value>)> {
    let spec = authorize(Resource::Catalog, Operation::Create, principal.as_ref())?;
    let body = write(&state, kind, None, spec, payload).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Handle `PUT /{collection}/{id}/`
pub async fn handle_replace(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<Value>> {
    let spec = authorize(Resource::Catalog, Operation::Replace, principal.as_ref())?;
    Ok(Json(write(&state, kind, Some(id), spec, payload).await?))
}

/// Handle `PATCH /{collection}/{id}/`
pub async fn handle_partial_update(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<Value>> {
    let spec = authorize(Resource::Catalog, Operation::PartialUpdate, principal.as_ref())?;
    Ok(Json(write(&state, kind, Some(id), spec, payload).await?))
}

/// Handle `DELETE /{collection}/{id}/`
pub async fn handle_destroy(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    authorize(Resource::Catalog, Operation::Destroy, principal.as_ref())?;
    state.services.catalog_service.destroy(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Store the upload, run the write and render the result
///
/// A stored upload is discarded again when the write fails.
async fn write(
    state: &AppState,
    kind: EntityKind,
    id: Option<i64>,
    spec: OperationSpec,
    mut payload: Payload,
) -> Result<Value> {
    let services = &state.services;
    let stored = match kind.schema().media_field() {
        Some((field, folder)) => payload.store_upload(&services.media, field, folder).await?,
        None => None,
    };

    let catalog = &services.catalog_service;
    let result = match id {
        None => catalog.create(kind, payload.body).await,
        Some(id) => catalog.update(kind, id, payload.body, spec.write_mode()).await,
    };

    match result {
        Ok(record) => catalog.represent(&record, spec.output).await,
        Err(error) => {
            if let Some(path) = stored {
                services.media.discard(&path).await;
            }
            Err(error)
        }
    }
}
