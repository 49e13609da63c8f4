//! Promotion service implementation
//!
//! Promotional banners are plain (non-translated) records managed by staff;
//! the active subset is public.

use serde_json::{Map, Value};
use tracing::info;

use crate::database::repositories::PromotionRepository;
use crate::models::promotion::{CreatePromotionRequest, Promotion, UpdatePromotionRequest};
use crate::translation::coerce::{self, NOT_BLANK, NOT_NULL, REQUIRED};
use crate::translation::WriteMode;
use crate::utils::errors::{FieldErrors, MenuError, Result};
use crate::utils::logging::log_entity_write;

/// Uploaded promotion images land in this media folder
pub const PROMOTION_MEDIA_FOLDER: &str = "promotions";

fn text_field(
    body: &Map<String, Value>,
    errors: &mut FieldErrors,
    field: &str,
    max_len: usize,
    allow_blank: bool,
) -> Option<String> {
    let value = body.get(field)?;
    if value.is_null() {
        errors.add(field, NOT_NULL);
        return None;
    }
    let text = match coerce::text(value) {
        Ok(text) => text,
        Err(message) => {
            errors.add(field, message);
            return None;
        }
    };
    if !allow_blank && text.trim().is_empty() {
        errors.add(field, NOT_BLANK);
        return None;
    }
    if let Err(message) = coerce::max_length(&text, max_len) {
        errors.add(field, message);
        return None;
    }
    Some(text)
}

/// Checked changes from a promotion body; every field is `None` when absent
pub fn validate_promotion(body: &Map<String, Value>, mode: WriteMode) -> Result<UpdatePromotionRequest> {
    let mut errors = FieldErrors::new();
    let full = matches!(mode, WriteMode::Create | WriteMode::Replace);

    let title = text_field(body, &mut errors, "title", 200, false);
    let description = text_field(body, &mut errors, "description", 500, true);
    let image = text_field(body, &mut errors, "image", 255, false);

    let is_active = body.get("is_active").and_then(|value| match coerce::boolean(value) {
        Ok(flag) => Some(flag),
        Err(message) => {
            errors.add("is_active", message);
            None
        }
    });

    let order = body.get("order").and_then(|value| match coerce::integer(value) {
        Ok(order) if order < 0 => {
            errors.add("order", "Ensure this value is greater than or equal to 0.");
            None
        }
        Ok(order) => match i32::try_from(order) {
            Ok(order) => Some(order),
            Err(_) => {
                errors.add("order", "Ensure this value is less than or equal to 2147483647.");
                None
            }
        },
        Err(message) => {
            errors.add("order", message);
            None
        }
    });

    if full {
        for field in ["title", "image"] {
            if !body.contains_key(field) {
                errors.add(field, REQUIRED);
            }
        }
    }

    errors.into_result()?;
    Ok(UpdatePromotionRequest {
        title,
        description,
        image,
        is_active,
        order,
    })
}

/// Promotion service for managing promotional banners
#[derive(Clone, Debug)]
pub struct PromotionService {
    promotion_repository: PromotionRepository,
}

impl PromotionService {
    /// Create a new PromotionService instance
    pub fn new(promotion_repository: PromotionRepository) -> Self {
        Self { promotion_repository }
    }

    pub async fn create(&self, body: &Map<String, Value>) -> Result<Promotion> {
        let changes = validate_promotion(body, WriteMode::Create)?;
        let request = CreatePromotionRequest {
            title: changes.title.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
            image: changes.image.unwrap_or_default(),
            is_active: changes.is_active.unwrap_or(true),
            order: changes.order.unwrap_or(0),
        };

        let promotion = self.promotion_repository.create(request).await?;
        log_entity_write("promotion", promotion.id, "create", &[]);
        Ok(promotion)
    }

    pub async fn list(&self, only_active: bool) -> Result<Vec<Promotion>> {
        self.promotion_repository.list(only_active).await
    }

    pub async fn get(&self, id: i64) -> Result<Promotion> {
        self.promotion_repository
            .find_by_id(id)
            .await?
            .ok_or(MenuError::NotFound { resource: "Promotion", id })
    }

    pub async fn update(&self, id: i64, body: &Map<String, Value>, mode: WriteMode) -> Result<Promotion> {
        let changes = validate_promotion(body, mode)?;
        let promotion = self
            .promotion_repository
            .update(id, changes)
            .await?
            .ok_or(MenuError::NotFound { resource: "Promotion", id })?;

        log_entity_write("promotion", id, "update", &[]);
        Ok(promotion)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.promotion_repository.delete(id).await? {
            return Err(MenuError::NotFound { resource: "Promotion", id });
        }
        info!(promotion_id = id, "Promotion deleted");
        Ok(())
    }
}
