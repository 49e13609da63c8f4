//! Error handling for Digital Menu
//!
//! This module defines the main error types used throughout the application,
//! the field-keyed validation error map returned to API clients, and the
//! mapping from errors to HTTP responses.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Main error type for Digital Menu application
#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: i64 },

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Digital Menu operations
pub type Result<T> = std::result::Result<T, MenuError>;

impl MenuError {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        MenuError::Validation(errors)
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MenuError::Database(_) => ErrorSeverity::Critical,
            MenuError::Migration(_) => ErrorSeverity::Critical,
            MenuError::Config(_) => ErrorSeverity::Critical,
            MenuError::ConfigLoad(_) => ErrorSeverity::Critical,
            MenuError::PermissionDenied(_) => ErrorSeverity::Warning,
            MenuError::Unauthorized(_) => ErrorSeverity::Warning,
            MenuError::Token(_) => ErrorSeverity::Warning,
            MenuError::RateLimitExceeded => ErrorSeverity::Warning,
            MenuError::Validation(_) => ErrorSeverity::Info,
            MenuError::NotFound { .. } => ErrorSeverity::Info,
            MenuError::Conflict(_) => ErrorSeverity::Info,
            MenuError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status code the error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            MenuError::Validation(_) | MenuError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MenuError::NotFound { .. } => StatusCode::NOT_FOUND,
            MenuError::Unauthorized(_) | MenuError::Token(_) => StatusCode::UNAUTHORIZED,
            MenuError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            MenuError::Conflict(_) => StatusCode::CONFLICT,
            MenuError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MenuError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            MenuError::Validation(errors) => json!(errors),
            MenuError::NotFound { .. } => json!({ "detail": "Not found." }),
            MenuError::Unauthorized(message)
            | MenuError::PermissionDenied(message)
            | MenuError::Conflict(message)
            | MenuError::InvalidInput(message) => json!({ "detail": message }),
            MenuError::Token(_) => json!({ "detail": "Given token not valid for any token type" }),
            MenuError::RateLimitExceeded => {
                json!({ "detail": "Request was throttled. Try again later." })
            }
            _ => json!({ "detail": "Internal server error." }),
        };

        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                error!(error = %self, severity = %self.severity(), "Request failed");
            }
            ErrorSeverity::Warning => warn!(error = %self, "Request rejected"),
            ErrorSeverity::Info => {}
        }

        (status, Json(body)).into_response()
    }
}

/// Field-keyed validation messages, serialized as `{"field": ["message", ...]}`.
///
/// Nested translation errors use dotted keys such as `translations.en.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(MenuError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_aggregate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("price", "Ensure this value is greater than or equal to 0.01.");
        errors.add("price", "A valid number is required.");
        errors.add("categories", "This field is required.");

        assert_eq!(errors.get("price").map(|m| m.len()), Some(2));
        assert!(errors.contains("categories"));
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["categories", "price"]);
    }

    #[test]
    fn test_field_errors_serialize_as_plain_map() {
        let mut errors = FieldErrors::new();
        errors.add("translations.en.name", "This field may not be blank.");

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            value,
            json!({ "translations.en.name": ["This field may not be blank."] })
        );
    }

    #[test]
    fn test_empty_field_errors_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MenuError::field("name", "x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            MenuError::NotFound { resource: "Product", id: 3 }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MenuError::Unauthorized("missing".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            MenuError::PermissionDenied("staff only".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(MenuError::RateLimitExceeded.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            MenuError::Config("bad".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(MenuError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(MenuError::RateLimitExceeded.severity(), ErrorSeverity::Warning);
        assert_eq!(MenuError::field("a", "b").severity(), ErrorSeverity::Info);
    }
}
