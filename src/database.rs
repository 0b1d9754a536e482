use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::models::{ExtractedObservation, TrackedProduct};
use crate::utils::error::{AppError, Result};

const PRODUCT_COLUMNS: &str = "id, url, name, current_price, original_price, discount, \
     target_price, target_discount, last_checked, active, created_at";

/// SQLite-backed store for tracked products.
#[derive(Debug, Clone)]
pub struct ProductStore {
    pool: SqlitePool,
}

impl ProductStore {
    /// Opens (creating if needed) the database file and ensures the schema.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        tracing::info!(url = %config.url, "Product store ready");
        Ok(store)
    }

    /// Private in-memory database, mostly for tests and `probe`.
    pub async fn in_memory() -> Result<Self> {
        // a single connection that never recycles, or the database vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                current_price REAL NOT NULL DEFAULT 0,
                original_price REAL NOT NULL DEFAULT 0,
                discount REAL NOT NULL DEFAULT 0,
                target_price REAL NOT NULL DEFAULT 0,
                target_discount REAL NOT NULL DEFAULT 0,
                last_checked DATETIME,
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // Removed products keep their row, so uniqueness only covers active ones
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_products_active_url
             ON products(url) WHERE active = 1",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a new active, not yet observed product and returns its id.
    pub async fn add_product(
        &self,
        url: &str,
        name: &str,
        target_price: f64,
        target_discount: f64,
    ) -> Result<i64> {
        self.add_observed_product(url, name, target_price, target_discount, None)
            .await
    }

    /// Inserts a new active product together with its first reading, so the row
    /// is never visible with an unset price once a reading exists.
    pub async fn add_observed_product(
        &self,
        url: &str,
        name: &str,
        target_price: f64,
        target_discount: f64,
        observation: Option<&ExtractedObservation>,
    ) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO products (url, name, current_price, original_price, discount,
                                   target_price, target_discount, last_checked, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(url)
        .bind(name)
        .bind(observation.map_or(0.0, |o| o.price))
        .bind(observation.map_or(0.0, |o| o.original_price))
        .bind(observation.map_or(0.0, |o| o.discount_percent))
        .bind(target_price)
        .bind(target_discount)
        .bind(observation.map(|_| now))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateTracking {
                url: url.to_string(),
            },
            other => AppError::Database(other),
        })?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_active(&self) -> Result<Vec<TrackedProduct>> {
        let products = sqlx::query_as::<_, TrackedProduct>(&format!(
            "SELECT {} FROM products WHERE active = 1 ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Any product, active or not.
    pub async fn get_by_id(&self, id: i64) -> Result<TrackedProduct> {
        sqlx::query_as::<_, TrackedProduct>(&format!(
            "SELECT {} FROM products WHERE id = ?",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    pub async fn list_all(&self) -> Result<Vec<TrackedProduct>> {
        let products = sqlx::query_as::<_, TrackedProduct>(&format!(
            "SELECT {} FROM products ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Stores a new price, leaving the original price and discount as they were.
    pub async fn update_price(&self, id: i64, price: f64) -> Result<()> {
        let result = sqlx::query("UPDATE products SET current_price = ?, last_checked = ? WHERE id = ?")
            .bind(price)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub async fn update_price_with_discount(
        &self,
        id: i64,
        price: f64,
        original_price: f64,
        discount: f64,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products
             SET current_price = ?, original_price = ?, discount = ?, last_checked = ?
             WHERE id = ?",
        )
        .bind(price)
        .bind(original_price)
        .bind(discount)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Persists a check result. Pages without promotion signals only update the
    /// price, so the last known original price and discount survive.
    pub async fn record_observation(&self, id: i64, observation: &ExtractedObservation) -> Result<()> {
        if observation.has_promotion_signals() {
            self.update_price_with_discount(
                id,
                observation.price,
                observation.original_price,
                observation.discount_percent,
            )
            .await
        } else {
            self.update_price(id, observation.price).await
        }
    }

    /// Soft delete. Fails with `NotFound` when the product is unknown or already inactive.
    pub async fn deactivate(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE products SET active = 0 WHERE id = ? AND active = 1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound {
        resource: format!("product {}", id),
    }
}
