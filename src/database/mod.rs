//! Database module
//!
//! This module handles database connections and operations

pub mod connection;
pub mod repositories;
pub mod service;
pub mod translatable;

// Re-export commonly used database components
pub use connection::{create_lazy_pool, create_pool, health_check, run_migrations, DatabasePool};
pub use repositories::{OrderRepository, PromotionRepository, UserRepository};
pub use service::DatabaseService;
pub use translatable::{PgStore, PgTx};
