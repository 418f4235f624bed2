//! # Checkout Transaction Coordinator
//!
//! Converts a cart of line items into a durable order while atomically
//! adjusting inventory, loyalty counters and financial totals.
//!
//! ## Checkout Flow
//! ```text
//! 1. validate cart lines, discount, payment fields     (nothing persisted)
//! 2. resolve products (active), snapshot sku/name/cost (reads only)
//! 3. read current tax_rate setting, price the cart     (reads only)
//! 4. reject InsufficientPayment                        (nothing persisted)
//! 5. BEGIN
//!      insert order (unique number; regenerate on collision)
//!      insert order items
//!      stock ledger: guarded decrement + movement, per line
//!      loyalty accrual, when a customer is attached
//!    COMMIT                      <- all-or-nothing
//! 6. spawn best-effort audit write                     (never blocks, never fails checkout)
//! 7. return the persisted order + items + customer summary
//! ```
//!
//! Only `InsufficientStock` and storage failures can occur inside the
//! atomic phase; both roll the whole unit of work back. The caller sees
//! exactly one of {full order, specific rejection} - never a partial
//! state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::audit::audit_entry;
use crate::repository::order::{generate_order_item_id, generate_order_number};
use crate::repository::stock::StockError;
use till_core::{
    price_cart, validation, CartLine, Customer, LoyaltyAccrual, Money, Order, OrderItem,
    OrderStatus, PaymentMethod, Product, ValidationError,
};

/// Bounded retries for order-number collisions before giving up.
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// One line of a checkout request.
///
/// `unit_price_cents` is the price snapshotted when the line entered the
/// cart; it drives subtotal computation. Cost, stock and tax rate are
/// never trusted from the request - they are re-read server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// The inbound checkout operation (`POST checkout` body equivalent).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_id: Option<String>,
    pub items: Vec<CheckoutItem>,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    /// Order-level discount on top of the per-line discounts.
    #[serde(default)]
    pub discount_cents: i64,
    pub note: Option<String>,
}

/// Customer state after the accrual, for the receipt/response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: String,
    pub member_code: String,
    pub first_name: String,
    pub last_name: String,
    pub loyalty_points: i64,
}

impl From<Customer> for CustomerSummary {
    fn from(customer: Customer) -> Self {
        CustomerSummary {
            id: customer.id,
            member_code: customer.member_code,
            first_name: customer.first_name,
            last_name: customer.last_name,
            loyalty_points: customer.loyalty_points,
        }
    }
}

/// A committed checkout: the persisted order, its items, and the updated
/// customer summary when one was attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCheckout {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub customer: Option<CustomerSummary>,
}

// =============================================================================
// Errors
// =============================================================================

/// Everything that can go wrong between a submitted cart and a committed
/// order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Bad input: empty cart, non-positive quantity, negative price,
    /// discount out of bounds. Nothing was persisted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A cart line references a product that does not exist or is
    /// inactive.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// The attached customer does not exist.
    #[error("Customer not found: {customer_id}")]
    CustomerNotFound { customer_id: String },

    /// `amount_paid` is short of the total. Nothing was persisted.
    #[error("Insufficient payment: required {required_cents}, paid {paid_cents}")]
    InsufficientPayment {
        required_cents: i64,
        paid_cents: i64,
    },

    /// A line would oversell its product; the whole transaction was
    /// rolled back.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Storage failure (or order-number retries exhausted). The
    /// transaction guarantees no partial state is visible.
    #[error(transparent)]
    Persistence(#[from] DbError),
}

impl CheckoutError {
    /// Machine-readable error kind for transport adapters.
    ///
    /// Everything except `INTERNAL` is a caller-correctable rejection
    /// (400-equivalent); `INTERNAL` is a 500-equivalent.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_)
            | CheckoutError::ProductNotFound { .. }
            | CheckoutError::CustomerNotFound { .. } => "VALIDATION_ERROR",
            CheckoutError::InsufficientPayment { .. } => "INSUFFICIENT_PAYMENT",
            CheckoutError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CheckoutError::Persistence(_) => "INTERNAL",
        }
    }
}

impl From<StockError> for CheckoutError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient {
                sku,
                available,
                requested,
            } => CheckoutError::InsufficientStock {
                sku,
                available,
                requested,
            },
            StockError::ProductNotFound(product_id) => {
                CheckoutError::ProductNotFound { product_id }
            }
            StockError::Db(db) => CheckoutError::Persistence(db),
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Orchestrates the checkout transaction.
///
/// Holds a [`Database`] handle; the settings repository is its explicit
/// tax-rate accessor, so tests pin a rate by writing the `tax_rate` row.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(db: Database) -> Self {
        CheckoutService { db }
    }

    /// Runs a checkout for the given operator.
    ///
    /// The operator identity must already be resolved by the caller
    /// (authentication is outside the core); an order is always attributed
    /// to a user.
    #[instrument(skip_all, fields(operator_id = %operator_id))]
    pub async fn checkout(
        &self,
        operator_id: &str,
        request: CheckoutRequest,
    ) -> Result<CompletedCheckout, CheckoutError> {
        // ---- Phase 1: validation, nothing persisted ----------------------
        validation::validate_order_discount(request.discount_cents)?;
        validation::validate_amount_paid(request.amount_paid_cents)?;

        let lines: Vec<CartLine> = request
            .items
            .iter()
            .map(|item| CartLine {
                unit_price_cents: item.unit_price_cents,
                quantity: item.quantity,
                discount_cents: item.discount_cents,
            })
            .collect();
        validation::validate_cart_lines(&lines)?;

        // ---- Phase 2: resolve collaborator reads -------------------------
        let products = self.resolve_products(&request.items).await?;

        let customer = match &request.customer_id {
            Some(customer_id) => Some(
                self.db
                    .customers()
                    .get_by_id(customer_id)
                    .await?
                    .ok_or_else(|| CheckoutError::CustomerNotFound {
                        customer_id: customer_id.clone(),
                    })?,
            ),
            None => None,
        };

        let tax_rate = self.db.settings().tax_rate().await?;

        // ---- Phase 3: totals ---------------------------------------------
        let totals = price_cart(&lines, request.discount_cents, tax_rate)?;

        let total_cost: i64 = request
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| product.cost_cents.unwrap_or(0) * item.quantity)
            .sum();
        let profit = totals.taxable_base() - Money::from_cents(total_cost);

        let amount_paid = Money::from_cents(request.amount_paid_cents);
        let change = amount_paid - totals.total();
        if change.is_negative() {
            return Err(CheckoutError::InsufficientPayment {
                required_cents: totals.total_cents,
                paid_cents: request.amount_paid_cents,
            });
        }

        // ---- Phase 4: the atomic unit of work ----------------------------
        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let order_number = {
            let orders = self.db.orders();
            let mut attempt = 0;
            loop {
                attempt += 1;
                let order_number = generate_order_number();
                let order = Order {
                    id: order_id.clone(),
                    order_number: order_number.clone(),
                    status: OrderStatus::Completed,
                    payment_method: request.payment_method,
                    subtotal_cents: totals.subtotal_cents,
                    discount_cents: totals.discount_cents,
                    tax_cents: totals.tax_cents,
                    total_amount_cents: totals.total_cents,
                    amount_paid_cents: request.amount_paid_cents,
                    change_cents: change.cents(),
                    profit_cents: profit.cents(),
                    customer_id: request.customer_id.clone(),
                    user_id: operator_id.to_string(),
                    note: request.note.clone(),
                    created_at: now,
                    completed_at: Some(now),
                };

                match orders.insert_order(&mut tx, &order).await {
                    Ok(()) => break order_number,
                    Err(err)
                        if err.is_unique_violation_on("order_number")
                            && attempt < MAX_ORDER_NUMBER_ATTEMPTS =>
                    {
                        // Collision on the random suffix; roll the dice again.
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let mut items = Vec::with_capacity(request.items.len());
        for (item, product) in request.items.iter().zip(&products) {
            let line = CartLine {
                unit_price_cents: item.unit_price_cents,
                quantity: item.quantity,
                discount_cents: item.discount_cents,
            };
            let order_item = OrderItem {
                id: generate_order_item_id(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                sku_snapshot: product.sku.clone(),
                name_snapshot: product.name.clone(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                discount_cents: item.discount_cents,
                total_price_cents: line.total().cents(),
                created_at: now,
            };
            self.db.orders().insert_item(&mut tx, &order_item).await?;
            items.push(order_item);
        }

        let ledger = self.db.stock();
        for item in &request.items {
            ledger
                .sell(&mut tx, &item.product_id, item.quantity, &order_number)
                .await?;
        }

        if let Some(customer) = &customer {
            let accrual = LoyaltyAccrual::for_order_total(totals.total());
            self.db
                .customers()
                .apply_accrual(&mut tx, &customer.id, &accrual)
                .await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_number = %order_number,
            total_cents = totals.total_cents,
            items = items.len(),
            "Checkout committed"
        );

        // ---- Phase 5: best-effort audit, after commit --------------------
        self.spawn_audit(operator_id, &order_id, &order_number, &totals.total(), items.len());

        // ---- Phase 6: response -------------------------------------------
        let order = self
            .db
            .orders()
            .get_by_id(&order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", &order_id))?;

        let customer = match customer {
            Some(customer) => self
                .db
                .customers()
                .get_by_id(&customer.id)
                .await?
                .map(CustomerSummary::from),
            None => None,
        };

        Ok(CompletedCheckout {
            order,
            items,
            customer,
        })
    }

    /// Resolves every cart line to an active product, in request order.
    async fn resolve_products(
        &self,
        items: &[CheckoutItem],
    ) -> Result<Vec<Product>, CheckoutError> {
        let repo = self.db.products();
        let mut products = Vec::with_capacity(items.len());

        for item in items {
            let product = repo
                .get_by_id(&item.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CheckoutError::ProductNotFound {
                    product_id: item.product_id.clone(),
                })?;
            products.push(product);
        }

        Ok(products)
    }

    /// Fires the post-commit audit write on a detached task. Failures are
    /// logged inside `record_best_effort` and go no further.
    fn spawn_audit(
        &self,
        operator_id: &str,
        order_id: &str,
        order_number: &str,
        total: &Money,
        item_count: usize,
    ) {
        let audit = self.db.audit();
        let entry = audit_entry(
            Some(operator_id),
            "CREATE",
            "order",
            Some(order_id),
            None,
            Some(json!({
                "orderNumber": order_number,
                "totalAmountCents": total.cents(),
                "itemCount": item_count,
            })),
        );

        tokio::spawn(async move {
            audit.record_best_effort(entry).await;
        });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
