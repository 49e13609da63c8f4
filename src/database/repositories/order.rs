//! Order repository implementation

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::order::{CreateOrderRequest, Order, OrderItem, OrderStatus, ProductSnapshot};
use crate::utils::errors::MenuError;

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.user_id, u.name AS user_name, u.email AS user_email, o.status, o.total_price,
           o.delivery_street, o.delivery_house_number, o.delivery_location, o.phone, o.notes,
           (SELECT COUNT(*) FROM order_items i WHERE i.order_id = o.id) AS items_count,
           o.created_at, o.updated_at
    FROM orders o
    JOIN users u ON u.id = o.user_id
"#;

#[derive(Clone)]
#[derive(Debug)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store an order with all of its items in one transaction
    pub async fn create(&self, request: CreateOrderRequest) -> Result<i64, MenuError> {
        let mut tx = self.pool.begin().await?;

        let (order_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO orders (user_id, status, total_price, delivery_street, delivery_house_number, delivery_location, phone, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(request.user_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(request.total_price)
        .bind(&request.delivery_street)
        .bind(&request.delivery_house_number)
        .bind(request.delivery_location.as_str())
        .bind(&request.phone)
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await?;

        for item in &request.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    /// Find an order, optionally restricted to one owner
    pub async fn find(&self, id: i64, owner: Option<i64>) -> Result<Option<Order>, MenuError> {
        let mut query = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        query.push(" WHERE o.id = ");
        query.push_bind(id);
        if let Some(owner) = owner {
            query.push(" AND o.user_id = ");
            query.push_bind(owner);
        }

        let order = query.build_query_as::<Order>().fetch_optional(&self.pool).await?;
        Ok(order)
    }

    /// Orders newest first, optionally restricted to one owner
    pub async fn list(&self, owner: Option<i64>, limit: i64, offset: i64) -> Result<Vec<Order>, MenuError> {
        let mut query = QueryBuilder::<Postgres>::new(ORDER_SELECT);
        if let Some(owner) = owner {
            query.push(" WHERE o.user_id = ");
            query.push_bind(owner);
        }
        query.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let orders = query.build_query_as::<Order>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    pub async fn count(&self, owner: Option<i64>) -> Result<i64, MenuError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::BIGINT IS NULL OR user_id = $1)")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Items of one order with the product's current price
    pub async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>, MenuError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT i.id, i.order_id, i.product_id, i.quantity, i.unit_price, i.subtotal, p.price AS product_price
            FROM order_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn update_status(&self, id: i64, status: OrderStatus) -> Result<bool, MenuError> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Price and availability for the given products
    pub async fn product_snapshots(&self, ids: &[i64]) -> Result<Vec<ProductSnapshot>, MenuError> {
        let snapshots = sqlx::query_as::<_, ProductSnapshot>(
            "SELECT id, price, available FROM products WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(snapshots)
    }

    /// Product names per product and language
    pub async fn product_names(&self, ids: &[i64]) -> Result<HashMap<i64, HashMap<String, String>>, MenuError> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT master_id, language_code, name FROM product_translations WHERE master_id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut names: HashMap<i64, HashMap<String, String>> = HashMap::new();
        for (product_id, language, name) in rows {
            names.entry(product_id).or_default().insert(language, name);
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_order_repository_creation() {
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = OrderRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
