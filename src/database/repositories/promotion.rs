//! Promotion repository implementation

use sqlx::PgPool;

use crate::models::promotion::{CreatePromotionRequest, Promotion, UpdatePromotionRequest};
use crate::utils::errors::MenuError;

const PROMOTION_COLUMNS: &str = "id, title, description, image, is_active, display_order, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct PromotionRepository {
    pool: PgPool,
}

impl PromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new promotion
    pub async fn create(&self, request: CreatePromotionRequest) -> Result<Promotion, MenuError> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            r#"
            INSERT INTO promotions (title, description, image, is_active, display_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PROMOTION_COLUMNS}
            "#
        ))
        .bind(request.title)
        .bind(request.description)
        .bind(request.image)
        .bind(request.is_active)
        .bind(request.order)
        .fetch_one(&self.pool)
        .await?;

        Ok(promotion)
    }

    /// Find promotion by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Promotion>, MenuError> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promotion)
    }

    /// All promotions, or only active ones, in display order
    pub async fn list(&self, only_active: bool) -> Result<Vec<Promotion>, MenuError> {
        let promotions = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE ($1 = FALSE OR is_active) ORDER BY display_order ASC, created_at DESC"
        ))
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(promotions)
    }

    /// Update promotion
    pub async fn update(&self, id: i64, request: UpdatePromotionRequest) -> Result<Option<Promotion>, MenuError> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            r#"
            UPDATE promotions
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                image = COALESCE($4, image),
                is_active = COALESCE($5, is_active),
                display_order = COALESCE($6, display_order),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROMOTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title)
        .bind(request.description)
        .bind(request.image)
        .bind(request.is_active)
        .bind(request.order)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promotion)
    }

    /// Delete promotion; `false` when no such promotion exists
    pub async fn delete(&self, id: i64) -> Result<bool, MenuError> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
