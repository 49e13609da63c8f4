//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod order;
pub mod promotion;
pub mod user;

// Re-export repositories
pub use order::OrderRepository;
pub use promotion::PromotionRepository;
pub use user::UserRepository;
