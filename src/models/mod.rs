//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod entity;
pub mod order;
pub mod pagination;
pub mod promotion;
pub mod user;

// Re-export commonly used models
pub use entity::{EntityRecord, FieldValue, TranslationFields, TranslationRecord, Translations};
pub use order::{
    CreateOrderRequest, DeliveryLocation, Order, OrderItem, OrderItemInput, OrderStatus, PricedItem,
    ProductSnapshot,
};
pub use pagination::{Page, PageRequest, Paginated};
pub use promotion::{CreatePromotionRequest, Promotion, UpdatePromotionRequest};
pub use user::{
    AccountInput, ChangePasswordRequest, CreateUserRequest, Role, UpdateUserRequest, User, UserProfile,
    UserScope,
};
