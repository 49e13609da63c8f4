//! Database service layer
//!
//! This module bundles the repositories and the catalog store over one pool

use crate::database::{DatabasePool, OrderRepository, PgStore, PromotionRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub pool: DatabasePool,
    pub users: UserRepository,
    pub orders: OrderRepository,
    pub promotions: PromotionRepository,
    pub catalog: PgStore,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            promotions: PromotionRepository::new(pool.clone()),
            catalog: PgStore::new(pool.clone()),
            pool,
        }
    }
}
