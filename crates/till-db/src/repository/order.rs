//! # Order Repository
//!
//! Persistence for orders and their line items.
//!
//! Orders are only ever written inside the checkout transaction (see
//! [`crate::checkout`]); the write methods here therefore take the
//! caller's transaction instead of the pool. Reads go straight to the
//! pool.

use chrono::Utc;
use rand::Rng;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use till_core::{Order, OrderItem};

const ORDER_COLUMNS: &str = "id, order_number, status, payment_method, subtotal_cents, \
     discount_cents, tax_cents, total_amount_cents, amount_paid_cents, change_cents, \
     profit_cents, customer_id, user_id, note, created_at, completed_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, sku_snapshot, name_snapshot, \
     quantity, unit_price_cents, discount_cents, total_price_cents, created_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts an order inside the caller's transaction.
    ///
    /// A duplicate order number surfaces as
    /// `DbError::UniqueViolation { field: "orders.order_number" }`; the
    /// coordinator regenerates the number and retries.
    pub async fn insert_order(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        order: &Order,
    ) -> DbResult<()> {
        debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

        sqlx::query(
            "INSERT INTO orders (
                id, order_number, status, payment_method,
                subtotal_cents, discount_cents, tax_cents, total_amount_cents,
                amount_paid_cents, change_cents, profit_cents,
                customer_id, user_id, note, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.tax_cents)
        .bind(order.total_amount_cents)
        .bind(order.amount_paid_cents)
        .bind(order.change_cents)
        .bind(order.profit_cents)
        .bind(&order.customer_id)
        .bind(&order.user_id)
        .bind(&order.note)
        .bind(order.created_at)
        .bind(order.completed_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Inserts one line item inside the caller's transaction.
    ///
    /// Snapshot pattern: sku/name/price were copied from the product at
    /// checkout, so order history survives later catalog edits.
    pub async fn insert_item(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        item: &OrderItem,
    ) -> DbResult<()> {
        debug!(order_id = %item.order_id, product_id = %item.product_id, "Inserting order item");

        sqlx::query(
            "INSERT INTO order_items (
                id, order_id, product_id, sku_snapshot, name_snapshot,
                quantity, unit_price_cents, discount_cents, total_price_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.discount_cents)
        .bind(item.total_price_cents)
        .bind(item.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by its business key (order number).
    pub async fn get_by_order_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1"
        ))
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets all line items for an order.
    pub async fn items_for_order(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Recent orders for one operator, newest first.
    pub async fn recent_for_operator(&self, user_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Counts persisted orders (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Order Number Generation
// =============================================================================

/// Alphabet for the random suffix: base36, uppercase.
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates an order number: `ORD-<YYYYMMDD>-<6 base36 chars>`.
///
/// ## Example
/// `ORD-20260807-K3F9ZQ`
///
/// Uniqueness is enforced by the database; a collision makes the
/// coordinator regenerate and retry.
pub fn generate_order_number() -> String {
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), base36_suffix(6))
}

/// Generates a random base36 suffix of the given length.
pub(crate) fn base36_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Generates a new order item ID.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
