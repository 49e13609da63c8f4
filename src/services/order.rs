//! Order service implementation
//!
//! This service validates order requests, prices items from the current
//! product prices, stores orders and renders them with product names in the
//! caller's language.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::database::repositories::OrderRepository;
use crate::i18n::I18n;
use crate::models::order::{
    CreateOrderRequest, DeliveryLocation, Order, OrderItem, OrderItemInput, OrderStatus, PricedItem,
    ProductSnapshot,
};
use crate::models::pagination::{Page, PageRequest};
use crate::services::auth::Principal;
use crate::translation::coerce::{self, NOT_BLANK, REQUIRED};
use crate::utils::errors::{FieldErrors, MenuError, Result};
use crate::utils::helpers::format_decimal;
use crate::utils::logging::log_order_event;

const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Largest amount the `NUMERIC(14, 2)` subtotal and total columns hold
// 99_999_999_999_999 x 10^-2, built via the const constructor.
const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);
const AMOUNT_TOO_LARGE: &str = "Ensure the order total does not exceed 999999999999.99.";

/// Order body as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderInput {
    pub delivery_street: Option<String>,
    pub delivery_house_number: Option<String>,
    pub delivery_location: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub items: Option<Value>,
}

/// Checked order fields, before pricing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub delivery_street: String,
    pub delivery_house_number: String,
    pub delivery_location: DeliveryLocation,
    pub phone: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

fn required_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, max_len: usize) -> String {
    match value.map(str::trim) {
        None => errors.add(field, REQUIRED),
        Some("") => errors.add(field, NOT_BLANK),
        Some(value) if value.chars().count() > max_len => errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        ),
        Some(value) => return value.to_string(),
    }
    String::new()
}

fn parse_items(value: Option<&Value>, errors: &mut FieldErrors) -> Vec<OrderItemInput> {
    let entries = match value {
        None | Some(Value::Null) => {
            errors.add("items", REQUIRED);
            return Vec::new();
        }
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            errors.add("items", "Expected a list of items.");
            return Vec::new();
        }
    };

    if entries.is_empty() {
        errors.add("items", "Order must have at least one item.");
        return Vec::new();
    }

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let (Some(product), Some(quantity)) = (entry.get("product"), entry.get("quantity")) else {
            errors.add("items", "Each item must have 'product' and 'quantity' fields.");
            continue;
        };
        match (coerce::integer(product), coerce::integer(quantity)) {
            (Ok(product), Ok(quantity)) => items.push(OrderItemInput { product, quantity }),
            (Err(message), _) | (_, Err(message)) => errors.add("items", message),
        }
    }
    items
}

/// Check the delivery details and item list of an order body
pub fn validate_order_input(input: &OrderInput) -> Result<OrderDraft> {
    let mut errors = FieldErrors::new();

    let delivery_street = required_text(&mut errors, "delivery_street", input.delivery_street.as_deref(), 200);
    let delivery_house_number = required_text(
        &mut errors,
        "delivery_house_number",
        input.delivery_house_number.as_deref(),
        20,
    );
    let phone = required_text(&mut errors, "phone", input.phone.as_deref(), 20);

    let delivery_location = match input.delivery_location.as_deref().map(str::trim) {
        None => {
            errors.add("delivery_location", REQUIRED);
            None
        }
        Some(raw) => {
            let location = DeliveryLocation::parse(&raw.to_lowercase());
            if location.is_none() {
                errors.add(
                    "delivery_location",
                    format!("\"{}\" is not a valid choice.", raw),
                );
            }
            location
        }
    };

    let notes = input
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .map(str::to_string);
    if notes.as_ref().is_some_and(|notes| notes.chars().count() > 500) {
        errors.add("notes", "Ensure this field has no more than 500 characters.");
    }

    let items = parse_items(input.items.as_ref(), &mut errors);

    errors.into_result()?;
    Ok(OrderDraft {
        delivery_street,
        delivery_house_number,
        delivery_location: delivery_location.unwrap_or(DeliveryLocation::Ardales),
        phone,
        notes,
        items,
    })
}

/// Price every item from the product snapshot; returns the items and the order total
pub fn price_items(items: &[OrderItemInput], snapshots: &[ProductSnapshot]) -> Result<(Vec<PricedItem>, Decimal)> {
    let products: HashMap<i64, &ProductSnapshot> = snapshots.iter().map(|product| (product.id, product)).collect();
    let mut errors = FieldErrors::new();
    let mut priced = Vec::with_capacity(items.len());

    for item in items {
        let Some(product) = products.get(&item.product) else {
            errors.add("items", format!("Product with id {} does not exist.", item.product));
            continue;
        };
        if !product.available {
            errors.add("items", format!("Product with id {} is not available.", item.product));
            continue;
        }
        if item.quantity < 1 {
            errors.add("items", "Quantity must be at least 1.");
            continue;
        }
        let Ok(quantity) = i32::try_from(item.quantity) else {
            errors.add("items", "Ensure this value is less than or equal to 2147483647.");
            continue;
        };

        let subtotal = match product.price.checked_mul(Decimal::from(quantity)) {
            Some(subtotal) if subtotal <= MAX_AMOUNT => subtotal,
            _ => {
                errors.add("items", AMOUNT_TOO_LARGE);
                continue;
            }
        };

        priced.push(PricedItem {
            product_id: product.id,
            quantity,
            unit_price: product.price,
            subtotal,
        });
    }

    errors.into_result()?;
    let total = priced
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal))
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(|| MenuError::field("items", AMOUNT_TOO_LARGE))?;
    Ok((priced, total))
}

/// Status change body for `PATCH /orders/{id}/`
pub fn parse_status(body: &serde_json::Map<String, Value>) -> Result<Option<OrderStatus>> {
    let Some(raw) = body.get("status") else {
        return Ok(None);
    };
    let raw = coerce::text(raw).map_err(|message| MenuError::field("status", message))?;
    OrderStatus::parse(raw.trim())
        .map(Some)
        .ok_or_else(|| MenuError::field("status", format!("\"{}\" is not a valid choice.", raw)))
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub id: i64,
    pub product: i64,
    pub product_name: String,
    pub product_price: String,
    pub quantity: i32,
    pub unit_price: String,
    pub subtotal: String,
}

/// Order list entry
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: i64,
    pub user: i64,
    pub user_name: String,
    pub user_email: String,
    pub status: String,
    pub total_price: String,
    pub items_count: i64,
    pub delivery_street: String,
    pub delivery_house_number: String,
    pub delivery_location: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user: order.user_id,
            user_name: order.user_name,
            user_email: order.user_email,
            status: order.status,
            total_price: format_decimal(order.total_price),
            items_count: order.items_count,
            delivery_street: order.delivery_street,
            delivery_house_number: order.delivery_house_number,
            delivery_location: order.delivery_location,
            phone: order.phone,
            created_at: order.created_at,
        }
    }
}

/// Full order with its items
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: i64,
    pub user: i64,
    pub user_name: String,
    pub user_email: String,
    pub status: String,
    pub total_price: String,
    pub delivery_street: String,
    pub delivery_house_number: String,
    pub delivery_location: String,
    pub phone: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order service for placing and managing orders
#[derive(Clone, Debug)]
pub struct OrderService {
    order_repository: OrderRepository,
    i18n: I18n,
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(order_repository: OrderRepository, i18n: I18n) -> Self {
        Self { order_repository, i18n }
    }

    /// Non-staff callers only ever see their own orders
    fn owner_filter(principal: &Principal) -> Option<i64> {
        (!principal.is_staff).then_some(principal.user_id)
    }

    pub async fn create(&self, principal: &Principal, input: OrderInput, language: &str) -> Result<OrderDetail> {
        let draft = validate_order_input(&input)?;

        let product_ids: Vec<i64> = draft.items.iter().map(|item| item.product).collect();
        let snapshots = self.order_repository.product_snapshots(&product_ids).await?;
        let (items, total_price) = price_items(&draft.items, &snapshots)?;

        let request = CreateOrderRequest {
            user_id: principal.user_id,
            delivery_street: draft.delivery_street,
            delivery_house_number: draft.delivery_house_number,
            delivery_location: draft.delivery_location,
            phone: draft.phone,
            notes: draft.notes,
            items,
            total_price,
        };
        let order_id = self.order_repository.create(request).await?;

        log_order_event(order_id, "created", principal.user_id, Some(&total_price.to_string()));
        info!(order_id = order_id, user_id = principal.user_id, total = %total_price, "Order placed");

        self.retrieve(principal, order_id, language).await
    }

    pub async fn list(&self, principal: &Principal, page: PageRequest) -> Result<Page<OrderSummary>> {
        let owner = Self::owner_filter(principal);
        let count = self.order_repository.count(owner).await?;
        let orders = self
            .order_repository
            .list(owner, page.limit(), page.offset())
            .await?;
        Ok(Page::new(count, orders).map(OrderSummary::from))
    }

    pub async fn retrieve(&self, principal: &Principal, id: i64, language: &str) -> Result<OrderDetail> {
        let order = self
            .order_repository
            .find(id, Self::owner_filter(principal))
            .await?
            .ok_or(MenuError::NotFound { resource: "Order", id })?;
        self.detail(order, language).await
    }

    /// Change the status of any order; a body without `status` leaves it unchanged
    pub async fn update_status(
        &self,
        principal: &Principal,
        id: i64,
        status: Option<OrderStatus>,
        language: &str,
    ) -> Result<OrderDetail> {
        if !principal.is_staff {
            return Err(MenuError::PermissionDenied("Only staff can update orders.".to_string()));
        }

        if let Some(status) = status {
            if !self.order_repository.update_status(id, status).await? {
                return Err(MenuError::NotFound { resource: "Order", id });
            }
            log_order_event(id, "status_changed", principal.user_id, Some(status.as_str()));
        }

        self.retrieve(principal, id, language).await
    }

    async fn detail(&self, order: Order, language: &str) -> Result<OrderDetail> {
        let items = self.order_repository.items(order.id).await?;
        let product_ids: Vec<i64> = items.iter().map(|item| item.product_id).collect();
        let names = self.order_repository.product_names(&product_ids).await?;
        debug!(order_id = order.id, items = items.len(), language = %language, "Rendering order");

        let items = items
            .into_iter()
            .map(|item| self.item_view(item, &names, language))
            .collect();

        Ok(OrderDetail {
            id: order.id,
            user: order.user_id,
            user_name: order.user_name,
            user_email: order.user_email,
            status: order.status,
            total_price: format_decimal(order.total_price),
            delivery_street: order.delivery_street,
            delivery_house_number: order.delivery_house_number,
            delivery_location: order.delivery_location,
            phone: order.phone,
            notes: order.notes,
            items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }

    fn item_view(
        &self,
        item: OrderItem,
        names: &HashMap<i64, HashMap<String, String>>,
        language: &str,
    ) -> OrderItemView {
        let product_name = names
            .get(&item.product_id)
            .and_then(|by_language| self.i18n.resolve(by_language, language))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());

        OrderItemView {
            id: item.id,
            product: item.product_id,
            product_name,
            product_price: format_decimal(item.product_price),
            quantity: item.quantity,
            unit_price: format_decimal(item.unit_price),
            subtotal: format_decimal(item.subtotal),
        }
    }
}
