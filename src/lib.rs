//! Digital Menu backend
//!
//! A multilingual restaurant menu API. This library provides the catalog of
//! translatable products, categories, ingredients and company details,
//! along with promotions, customer orders and staff/client accounts.

pub mod config;
pub mod database;
pub mod handlers;
pub mod i18n;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod translation;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{MenuError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::build_router;
pub use i18n::I18n;
pub use services::ServiceFactory;
pub use state::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
