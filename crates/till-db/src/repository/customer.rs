//! # Customer Repository
//!
//! Loyalty customer directory plus the accrual write. The three loyalty
//! counters are only ever incremented here, and only inside a checkout
//! transaction - increments are delta UPDATEs, never read-modify-write
//! from the application, so concurrent orders for the same customer
//! cannot lose updates.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::base36_suffix;
use till_core::{Customer, LoyaltyAccrual};

const CUSTOMER_COLUMNS: &str = "id, member_code, first_name, last_name, phone, email, \
     loyalty_points, total_spent_cents, visit_count, is_active, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by member code.
    pub async fn get_by_member_code(&self, member_code: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE member_code = ?1"
        ))
        .bind(member_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    ///
    /// Returns `DbError::UniqueViolation` when the member code already
    /// exists.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(member_code = %customer.member_code, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (
                id, member_code, first_name, last_name, phone, email,
                loyalty_points, total_spent_cents, visit_count,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&customer.id)
        .bind(&customer.member_code)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.loyalty_points)
        .bind(customer.total_spent_cents)
        .bind(customer.visit_count)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies a loyalty accrual inside the caller's transaction.
    ///
    /// Increment-only deltas; committed exactly once per order because the
    /// accrual lives and dies with the checkout transaction.
    pub async fn apply_accrual(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        customer_id: &str,
        accrual: &LoyaltyAccrual,
    ) -> DbResult<()> {
        debug!(
            customer_id = %customer_id,
            points = %accrual.points,
            spent_cents = %accrual.spent_cents,
            "Applying loyalty accrual"
        );

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE customers SET
                loyalty_points = loyalty_points + ?2,
                total_spent_cents = total_spent_cents + ?3,
                visit_count = visit_count + ?4,
                updated_at = ?5
            WHERE id = ?1",
        )
        .bind(customer_id)
        .bind(accrual.points)
        .bind(accrual.spent_cents)
        .bind(accrual.visits)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", customer_id));
        }

        Ok(())
    }
}

/// Generates a member code: `MEM-<6 base36 chars>`.
pub fn generate_member_code() -> String {
    format!("MEM-{}", base36_suffix(6))
}

/// Generates a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}
