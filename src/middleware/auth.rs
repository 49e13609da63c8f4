//! Authentication middleware
//!
//! Bearer-token extraction for API handlers. A request without an
//! `Authorization` header is anonymous; a request with a malformed or
//! invalid token is rejected outright.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{debug, warn};

use crate::services::auth::Principal;
use crate::state::AppState;
use crate::utils::errors::MenuError;

/// The caller, if the request carried a valid access token
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
    pub fn as_ref(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = MenuError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or_else(|| {
                warn!("Malformed Authorization header");
                MenuError::Unauthorized("Authorization header must contain two space-delimited values".to_string())
            })?;

        let principal = state.services.auth_service.authenticate(token)?;
        debug!(user_id = principal.user_id, role = %principal.role, "Request authenticated");
        Ok(Self(Some(principal)))
    }
}
