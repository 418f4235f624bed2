//! # Stock Ledger
//!
//! Every change to a product's `stock_quantity` flows through this module
//! and leaves an append-only [`StockMovement`] behind, with before/after
//! levels read from the live row inside the same transaction - the trail
//! is the ledger, not a decoration.
//!
//! ## Oversell Protection
//! ```text
//! UPDATE products
//! SET    stock_quantity = stock_quantity - :qty
//! WHERE  id = :id AND stock_quantity >= :qty
//! ```
//! The guard plus SQLite's single-writer serialization means two
//! simultaneous checkouts for the last unit cannot both succeed: the
//! second write observes the already-decremented row and affects zero
//! rows, which surfaces as [`StockError::Insufficient`] and aborts that
//! checkout's whole transaction.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::{MovementType, StockMovement};

// =============================================================================
// Errors
// =============================================================================

/// Stock ledger failures.
#[derive(Debug, Error)]
pub enum StockError {
    /// The decrement would take stock below zero.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    Insufficient {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// No such product (or it was hard-removed out of band).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Underlying storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for StockError {
    fn from(err: sqlx::Error) -> Self {
        StockError::Db(DbError::from(err))
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Serialized access to product stock counters plus the movement trail.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    /// Creates a new StockLedger.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Sells `quantity` units of a product inside the caller's
    /// transaction: guarded decrement, then an `OUT` movement recording
    /// the true before/after levels.
    ///
    /// `reference` is the order number the sale belongs to. The caller
    /// owns the transaction; on any error it must roll the whole unit of
    /// work back - this method never commits.
    pub async fn sell(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        product_id: &str,
        quantity: i64,
        reference: &str,
    ) -> Result<StockMovement, StockError> {
        debug!(product_id = %product_id, quantity = %quantity, "Selling stock");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products
             SET stock_quantity = stock_quantity - ?2, updated_at = ?3
             WHERE id = ?1 AND stock_quantity >= ?2",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing product from a real shortfall.
            let row: Option<(String, i64)> =
                sqlx::query_as("SELECT sku, stock_quantity FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut **tx)
                    .await?;

            return Err(match row {
                Some((sku, available)) => StockError::Insufficient {
                    sku,
                    available,
                    requested: quantity,
                },
                None => StockError::ProductNotFound(product_id.to_string()),
            });
        }

        let new_stock: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_one(&mut **tx)
                .await?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            movement_type: MovementType::Out,
            quantity: -quantity,
            previous_stock: new_stock + quantity,
            new_stock,
            reference: Some(reference.to_string()),
            created_at: now,
        };

        self.insert_movement(tx, &movement).await?;

        Ok(movement)
    }

    /// Receives `quantity` units into stock (`IN` movement), e.g. a
    /// delivery or the opening balance of a new product.
    pub async fn receive(
        &self,
        product_id: &str,
        quantity: i64,
        reference: Option<&str>,
    ) -> Result<StockMovement, StockError> {
        debug!(product_id = %product_id, quantity = %quantity, "Receiving stock");

        let mut tx = self.pool.begin().await?;
        let movement = self
            .apply_delta(&mut tx, product_id, quantity, MovementType::In, reference)
            .await?;
        tx.commit().await?;

        Ok(movement)
    }

    /// Applies a signed manual correction (`ADJUSTMENT` movement). A
    /// negative delta is still guarded: stock never goes below zero.
    pub async fn adjust(
        &self,
        product_id: &str,
        delta: i64,
        reference: Option<&str>,
    ) -> Result<StockMovement, StockError> {
        debug!(product_id = %product_id, delta = %delta, "Adjusting stock");

        let mut tx = self.pool.begin().await?;
        let movement = self
            .apply_delta(&mut tx, product_id, delta, MovementType::Adjustment, reference)
            .await?;
        tx.commit().await?;

        Ok(movement)
    }

    /// Shared guarded-delta path for `receive`/`adjust`.
    async fn apply_delta(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        product_id: &str,
        delta: i64,
        movement_type: MovementType,
        reference: Option<&str>,
    ) -> Result<StockMovement, StockError> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products
             SET stock_quantity = stock_quantity + ?2, updated_at = ?3
             WHERE id = ?1 AND stock_quantity + ?2 >= 0",
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            let row: Option<(String, i64)> =
                sqlx::query_as("SELECT sku, stock_quantity FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut **tx)
                    .await?;

            return Err(match row {
                Some((sku, available)) => StockError::Insufficient {
                    sku,
                    available,
                    requested: -delta,
                },
                None => StockError::ProductNotFound(product_id.to_string()),
            });
        }

        let new_stock: i64 =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_one(&mut **tx)
                .await?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            movement_type,
            quantity: delta,
            previous_stock: new_stock - delta,
            new_stock,
            reference: reference.map(str::to_string),
            created_at: now,
        };

        self.insert_movement(tx, &movement).await?;

        Ok(movement)
    }

    async fn insert_movement(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        movement: &StockMovement,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO stock_movements (
                id, product_id, movement_type, quantity,
                previous_stock, new_stock, reference, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.previous_stock)
        .bind(movement.new_stock)
        .bind(&movement.reference)
        .bind(movement.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Reads the movement trail for a product, newest first.
    pub async fn movements_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, movement_type, quantity,
                    previous_stock, new_stock, reference, created_at
             FROM stock_movements
             WHERE product_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Reads movements attached to a reference (e.g. all lines of one
    /// order number).
    pub async fn movements_for_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, movement_type, quantity,
                    previous_stock, new_stock, reference, created_at
             FROM stock_movements
             WHERE reference = ?1
             ORDER BY created_at, id",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}
