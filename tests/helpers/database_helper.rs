//! Test database helper utilities
//!
//! Database-backed tests run only when `TEST_DATABASE_URL` points at a
//! PostgreSQL database the tests may freely truncate.

use std::sync::Once;

use sqlx::PgPool;

static INIT: Once = Once::new();

/// Tables emptied between tests, dependants first
const TABLES: [&str; 13] = [
    "order_items",
    "orders",
    "product_ingredients",
    "product_categories",
    "product_translations",
    "products",
    "category_translations",
    "categories",
    "ingredient_translations",
    "ingredients",
    "company_translations",
    "companies",
    "promotions",
];

pub struct TestDatabase {
    pub pool: PgPool,
}

impl TestDatabase {
    /// Connect and migrate, or `None` when no test database is configured
    pub async fn from_env() -> Option<Self> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });

        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let pool = PgPool::connect(&url).await.expect("Failed to connect to test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let database = Self { pool };
        database.cleanup().await.expect("Failed to clean test database");
        Some(database)
    }

    /// Remove all rows written by tests
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        for table in TABLES {
            sqlx::query(&format!("DELETE FROM {}", table)).execute(&self.pool).await?;
        }
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn count_records(&self, table: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
    }
}
