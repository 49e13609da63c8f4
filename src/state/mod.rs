//! Application state
//!
//! Everything a request handler needs, shared across requests

use std::sync::Arc;

use crate::config::Settings;
use crate::database::{DatabasePool, DatabaseService};
use crate::i18n::I18n;
use crate::middleware::RateLimitMiddleware;
use crate::services::ServiceFactory;

#[derive(Clone, Debug)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub services: Arc<ServiceFactory>,
    pub i18n: Arc<I18n>,
    /// Throttles token requests per username
    pub login_limiter: RateLimitMiddleware,
    pub pool: DatabasePool,
}

impl AppState {
    pub fn new(settings: Settings, pool: DatabasePool) -> Self {
        let database = DatabaseService::new(pool.clone());
        let services = ServiceFactory::new(&settings, database);

        Self {
            i18n: Arc::new(I18n::new(&settings.i18n)),
            login_limiter: RateLimitMiddleware::new(settings.auth.login_attempts_per_minute),
            services: Arc::new(services),
            settings: Arc::new(settings),
            pool,
        }
    }
}
