//! Request language negotiation

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;

use crate::state::AppState;
use crate::utils::errors::MenuError;

/// Supported language chosen from `Accept-Language`, or the default language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLanguage(pub String);

#[async_trait]
impl FromRequestParts<AppState> for RequestLanguage {
    type Rejection = MenuError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        Ok(Self(state.i18n.detect_language(header)))
    }
}
