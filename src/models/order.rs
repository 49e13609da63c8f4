//! Order models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == value)
    }
}

/// Towns the restaurant delivers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryLocation {
    Ardales,
    Carratraca,
}

impl DeliveryLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryLocation::Ardales => "ardales",
            DeliveryLocation::Carratraca => "carratraca",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ardales" => Some(DeliveryLocation::Ardales),
            "carratraca" => Some(DeliveryLocation::Carratraca),
            _ => None,
        }
    }
}

/// Order row joined with the ordering user's name and email
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    pub status: String,
    pub total_price: Decimal,
    pub delivery_street: String,
    pub delivery_house_number: String,
    pub delivery_location: String,
    pub phone: String,
    pub notes: Option<String>,
    pub items_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    /// Current price of the product, which may differ from `unit_price`
    pub product_price: Decimal,
}

/// Price and availability of a product at order time
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ProductSnapshot {
    pub id: i64,
    pub price: Decimal,
    pub available: bool,
}

/// One requested line, before validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItemInput {
    pub product: i64,
    pub quantity: i64,
}

/// A validated line priced from the product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// Validated order ready to be stored
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub delivery_street: String,
    pub delivery_house_number: String,
    pub delivery_location: DeliveryLocation,
    pub phone: String,
    pub notes: Option<String>,
    pub items: Vec<PricedItem>,
    pub total_price: Decimal,
}
