//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub i18n: I18nConfig,
    pub logging: LoggingConfig,
    pub media: MediaConfig,
    pub pagination: PaginationConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

/// Token and account configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    /// Token requests allowed per username and minute
    pub login_attempts_per_minute: u32,
    pub bootstrap_admin: Option<BootstrapAdminConfig>,
}

/// Superuser created at startup when no account with that username exists
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapAdminConfig {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Internationalization configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct I18nConfig {
    pub default_language: String,
    pub supported_languages: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; empty disables file output.
    pub file_path: String,
    pub json: bool,
}

/// Uploaded media storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    pub root: String,
    pub url_prefix: String,
    pub max_upload_bytes: usize,
}

/// List endpoint paging
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaginationConfig {
    pub page_size: i64,
    pub max_page_size: i64,
}

impl Settings {
    /// Load settings from defaults, configuration file and environment variables
    ///
    /// Environment keys use the `DIGITAL_MENU` prefix and `__` between
    /// sections, e.g. `DIGITAL_MENU__DATABASE__URL`.
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("DIGITAL_MENU")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_allowed_origins")
                    .with_list_parse_key("i18n.supported_languages")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::MenuError> {
        super::validation::validate_settings(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_allowed_origins: vec![],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/digital_menu".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 5,
                run_migrations: true,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                access_token_minutes: 60,
                refresh_token_days: 1,
                login_attempts_per_minute: 10,
                bootstrap_admin: None,
            },
            i18n: I18nConfig {
                default_language: "es".to_string(),
                supported_languages: vec!["es".to_string(), "en".to_string()],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
                json: false,
            },
            media: MediaConfig {
                root: "media".to_string(),
                url_prefix: "/media".to_string(),
                max_upload_bytes: 5 * 1024 * 1024,
            },
            pagination: PaginationConfig {
                page_size: 10,
                max_page_size: 100,
            },
        }
    }
}
