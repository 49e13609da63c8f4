//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod catalog;
pub mod media;
pub mod order;
pub mod promotion;
pub mod user;

// Re-export commonly used services
pub use auth::{AuthService, Capability, Principal, TokenIssuer, TokenPair, TokenType};
pub use catalog::CatalogService;
pub use media::MediaStorage;
pub use order::OrderService;
pub use promotion::PromotionService;
pub use user::UserService;

use crate::config::Settings;
use crate::database::{DatabaseService, PgStore};
use crate::i18n::I18n;

/// Service factory for creating and managing all services
#[derive(Clone, Debug)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub catalog_service: CatalogService<PgStore>,
    pub order_service: OrderService,
    pub promotion_service: PromotionService,
    pub media: MediaStorage,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, database: DatabaseService) -> Self {
        let i18n = I18n::new(&settings.i18n);

        Self {
            auth_service: AuthService::new(&settings.auth, database.users.clone()),
            user_service: UserService::new(database.users),
            catalog_service: CatalogService::new(database.catalog, settings.i18n.supported_languages.clone()),
            order_service: OrderService::new(database.orders, i18n),
            promotion_service: PromotionService::new(database.promotions),
            media: MediaStorage::new(&settings.media),
        }
    }
}
