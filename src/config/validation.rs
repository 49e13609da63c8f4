//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{MenuError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_i18n_config(&settings.i18n)?;
    validate_logging_config(&settings.logging)?;
    validate_media_config(&settings.media)?;
    validate_pagination_config(&settings.pagination)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(MenuError::Config("Server host is required".to_string()));
    }

    for origin in &config.cors_allowed_origins {
        url::Url::parse(origin)?;
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(MenuError::Config("Database URL is required".to_string()));
    }

    let url = url::Url::parse(&config.url)?;
    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(MenuError::Config(format!(
            "Unsupported database scheme: {}",
            url.scheme()
        )));
    }

    if config.max_connections == 0 {
        return Err(MenuError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(MenuError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate token and account configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < 32 {
        return Err(MenuError::Config(
            "JWT secret must be at least 32 characters".to_string(),
        ));
    }

    if config.access_token_minutes <= 0 || config.refresh_token_days <= 0 {
        return Err(MenuError::Config(
            "Token lifetimes must be greater than 0".to_string(),
        ));
    }

    if config.login_attempts_per_minute == 0 {
        return Err(MenuError::Config(
            "Login attempts per minute must be greater than 0".to_string(),
        ));
    }

    if let Some(ref admin) = config.bootstrap_admin {
        if admin.username.is_empty() || admin.password.is_empty() || admin.email.is_empty() {
            return Err(MenuError::Config(
                "Bootstrap admin requires username, email and password".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate internationalization configuration
fn validate_i18n_config(config: &super::I18nConfig) -> Result<()> {
    if config.default_language.is_empty() {
        return Err(MenuError::Config("Default language is required".to_string()));
    }

    if config.supported_languages.is_empty() {
        return Err(MenuError::Config(
            "At least one supported language is required".to_string(),
        ));
    }

    if !config.supported_languages.contains(&config.default_language) {
        return Err(MenuError::Config(
            "Default language must be in supported languages list".to_string(),
        ));
    }

    if let Some(code) = config
        .supported_languages
        .iter()
        .find(|code| code.is_empty() || code.len() > 15)
    {
        return Err(MenuError::Config(format!("Invalid language code: {:?}", code)));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(MenuError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(MenuError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

/// Validate media storage configuration
fn validate_media_config(config: &super::MediaConfig) -> Result<()> {
    if config.root.is_empty() {
        return Err(MenuError::Config("Media root is required".to_string()));
    }

    if !config.url_prefix.starts_with('/') {
        return Err(MenuError::Config(
            "Media URL prefix must start with '/'".to_string(),
        ));
    }

    let segment = config.url_prefix.trim_matches('/');
    if segment.is_empty() || segment == "api" || segment.starts_with("api/") {
        return Err(MenuError::Config(
            "Media URL prefix must name a path outside the API".to_string(),
        ));
    }

    if config.max_upload_bytes == 0 {
        return Err(MenuError::Config(
            "Max upload size must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate pagination configuration
fn validate_pagination_config(config: &super::PaginationConfig) -> Result<()> {
    if config.page_size <= 0 || config.max_page_size < config.page_size {
        return Err(MenuError::Config(
            "Page size must be positive and not exceed the max page size".to_string(),
        ));
    }

    Ok(())
}
