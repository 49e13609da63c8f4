//! Account handlers
//!
//! Client and employee management share one set of handlers; the account
//! group is attached to each route group as an extension.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};

use super::access::{authorize, authorize_caller, Operation, OperationSpec, Resource};
use super::payload::{parse_body, require_fields, Payload};
use crate::middleware::MaybePrincipal;
use crate::models::pagination::{Page, PageRequest, Paginated};
use crate::models::user::{AccountInput, ChangePasswordRequest, Role, User, UserProfile, UserScope};
use crate::services::user::visibility_scope;
use crate::state::AppState;
use crate::translation::listing::page_from_params;
use crate::utils::errors::Result;

/// Uploaded avatars land in this media folder
pub const AVATAR_MEDIA_FOLDER: &str = "avatar";

/// Accounts managed through one collection route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountGroup {
    pub resource: Resource,
    pub role: Role,
}

pub const CLIENTS: AccountGroup = AccountGroup {
    resource: Resource::Clients,
    role: Role::Client,
};

pub const EMPLOYEES: AccountGroup = AccountGroup {
    resource: Resource::Employees,
    role: Role::Employe,
};

fn group_routes(segment: &str, group: AccountGroup) -> Router<AppState> {
    Router::new()
        .route(&format!("/{}/", segment), get(handle_list).post(handle_register))
        .route(
            &format!("/{}/:id/", segment),
            get(handle_retrieve)
                .put(handle_replace)
                .patch(handle_partial_update)
                .delete(handle_destroy),
        )
        .layer(Extension(group))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(group_routes("clients", CLIENTS))
        .merge(group_routes("employe", EMPLOYEES))
        .route("/users-list/", get(handle_users_list))
        .route("/users-list/:id/", get(handle_users_retrieve))
        .route("/me/", get(handle_me).patch(handle_update_me))
        .route("/change-password/", post(handle_change_password))
}

fn profile(user: &User) -> Json<UserProfile> {
    Json(UserProfile::from(user))
}

fn profiles(page: Page<User>, request: PageRequest) -> Json<Paginated<UserProfile>> {
    Json(Paginated::from_page(page.map(|user| UserProfile::from(&user)), request))
}

/// Store an uploaded avatar and parse the account fields
async fn account_input(state: &AppState, mut payload: Payload) -> Result<(AccountInput, Option<String>)> {
    let stored = payload
        .store_upload(&state.services.media, "image", AVATAR_MEDIA_FOLDER)
        .await?;
    match payload.parse::<AccountInput>() {
        Ok(input) => Ok((input, stored)),
        Err(error) => {
            discard(state, stored).await;
            Err(error)
        }
    }
}

async fn discard(state: &AppState, stored: Option<String>) {
    if let Some(path) = stored {
        state.services.media.discard(&path).await;
    }
}

/// Handle `POST /clients/` and `POST /employe/`
pub async fn handle_register(
    State(state): State<AppState>,
    Extension(group): Extension<AccountGroup>,
    principal: MaybePrincipal,
    payload: Payload,
) -> Result<(StatusCode, Json<UserProfile>)> {
    authorize(group.resource, Operation::Create, principal.as_ref())?;
    let (input, stored) = account_input(&state, payload).await?;

    match state.services.user_service.register(input, group.role).await {
        Ok(user) => Ok((StatusCode::CREATED, profile(&user))),
        Err(error) => {
            discard(&state, stored).await;
            Err(error)
        }
    }
}

/// Handle `GET /clients/` and `GET /employe/`
pub async fn handle_list(
    State(state): State<AppState>,
    Extension(group): Extension<AccountGroup>,
    principal: MaybePrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Paginated<UserProfile>>> {
    authorize(group.resource, Operation::List, principal.as_ref())?;
    let page = page_from_params(&params, &state.settings.pagination)?;
    let users = state
        .services
        .user_service
        .list(UserScope::Role(group.role), page)
        .await?;
    Ok(profiles(users, page))
}

pub async fn handle_retrieve(
    State(state): State<AppState>,
    Extension(group): Extension<AccountGroup>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>> {
    authorize(group.resource, Operation::Retrieve, principal.as_ref())?;
    let user = state
        .services
        .user_service
        .get(UserScope::Role(group.role), id)
        .await?;
    Ok(profile(&user))
}

pub async fn handle_replace(
    State(state): State<AppState>,
    Extension(group): Extension<AccountGroup>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<UserProfile>> {
    let spec = authorize(group.resource, Operation::Replace, principal.as_ref())?;
    update(&state, group, id, spec, payload).await
}

pub async fn handle_partial_update(
    State(state): State<AppState>,
    Extension(group): Extension<AccountGroup>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
    payload: Payload,
) -> Result<Json<UserProfile>> {
    let spec = authorize(group.resource, Operation::PartialUpdate, principal.as_ref())?;
    update(&state, group, id, spec, payload).await
}

async fn update(
    state: &AppState,
    group: AccountGroup,
    id: i64,
    spec: OperationSpec,
    payload: Payload,
) -> Result<Json<UserProfile>> {
    let (input, stored) = account_input(state, payload).await?;
    let result = state
        .services
        .user_service
        .update(UserScope::Role(group.role), id, input, spec.write_mode())
        .await;

    match result {
        Ok(user) => Ok(profile(&user)),
        Err(error) => {
            discard(state, stored).await;
            Err(error)
        }
    }
}

pub async fn handle_destroy(
    State(state): State<AppState>,
    Extension(group): Extension<AccountGroup>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    authorize(group.resource, Operation::Destroy, principal.as_ref())?;
    state
        .services
        .user_service
        .delete(UserScope::Role(group.role), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handle `GET /users-list/`: every account for staff, clients and self for employees
pub async fn handle_users_list(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Paginated<UserProfile>>> {
    let (_, caller) = authorize_caller(Resource::UsersList, Operation::List, principal.as_ref())?;
    let scope = visibility_scope(caller)?;
    let page = page_from_params(&params, &state.settings.pagination)?;
    let users = state.services.user_service.list(scope, page).await?;
    Ok(profiles(users, page))
}

pub async fn handle_users_retrieve(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>> {
    let (_, caller) = authorize_caller(Resource::UsersList, Operation::Retrieve, principal.as_ref())?;
    let scope = visibility_scope(caller)?;
    let user = state.services.user_service.get(scope, id).await?;
    Ok(profile(&user))
}

/// Handle `GET /me/`
pub async fn handle_me(State(state): State<AppState>, principal: MaybePrincipal) -> Result<Json<UserProfile>> {
    let (_, caller) = authorize_caller(Resource::Profile, Operation::Retrieve, principal.as_ref())?;
    let user = state.services.user_service.me(caller).await?;
    Ok(profile(&user))
}

/// Handle `PATCH /me/`: profile fields only
pub async fn handle_update_me(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    payload: Payload,
) -> Result<Json<UserProfile>> {
    let (_, caller) = authorize_caller(Resource::Profile, Operation::PartialUpdate, principal.as_ref())?;
    let (input, stored) = account_input(&state, payload).await?;

    match state.services.user_service.update_me(caller, input).await {
        Ok(user) => Ok(profile(&user)),
        Err(error) => {
            discard(&state, stored).await;
            Err(error)
        }
    }
}

/// Handle `POST /change-password/`
pub async fn handle_change_password(
    State(state): State<AppState>,
    principal: MaybePrincipal,
    payload: Payload,
) -> Result<Json<Value>> {
    let (_, caller) = authorize_caller(Resource::PasswordChange, Operation::Create, principal.as_ref())?;

    let body = payload.into_map();
    require_fields(&body, &["old_password", "new_password", "new_password_confirm"])?;
    let request: ChangePasswordRequest = parse_body(body)?;

    state.services.user_service.change_password(caller, request).await?;
    Ok(Json(json!({ "detail": "Password updated successfully." })))
}
