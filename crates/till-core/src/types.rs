//! # Domain Types
//!
//! Core domain types for Tillpoint.
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, order_number, member_code) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 825 bps = 8.25%. Integer basis
/// points keep tax math exact; percentages only exist at the edges
/// (the `tax_rate` setting is stored as a percentage string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (e.g. `10.0` for 10%).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// Checkout only ever creates `Completed` orders; the other states belong
/// to follow-up workflows (holds, voids, returns) outside the checkout
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Digital wallet / QR payment.
    Digital,
}

// =============================================================================
// Stock Movement Type
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Goods received into stock.
    In,
    /// Goods sold out of stock.
    Out,
    /// Manual correction (count, damage, shrinkage).
    Adjustment,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Never deleted: deactivated via `is_active` so historical orders keep
/// their references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    pub description: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Cost price in cents (for profit calculations).
    pub cost_cents: Option<i64>,

    /// Current stock level. Invariant: never negative.
    pub stock_quantity: i64,

    /// Advisory low-stock threshold; never blocks a sale.
    pub min_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost price as Money, if recorded.
    #[inline]
    pub fn cost(&self) -> Option<Money> {
        self.cost_cents.map(Money::from_cents)
    }

    /// Advisory check: stock has reached the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }
}

// =============================================================================
// Order
// =============================================================================

/// A persisted order, created atomically with its items at checkout.
///
/// Invariants: `amount_paid_cents >= total_amount_cents` and
/// `change_cents = amount_paid_cents - total_amount_cents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,

    /// Human-readable business key: `ORD-<YYYYMMDD>-<6 base36 chars>`.
    pub order_number: String,

    pub status: OrderStatus,
    pub payment_method: PaymentMethod,

    /// Sum of unit_price x quantity over all lines (discounts tracked
    /// separately, not folded in).
    pub subtotal_cents: i64,

    /// Per-line discounts plus the order-level discount.
    pub discount_cents: i64,

    pub tax_cents: i64,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub change_cents: i64,

    /// Taxable base minus aggregate cost of goods.
    pub profit_cents: i64,

    /// Attached loyalty customer, if any.
    pub customer_id: Option<String>,

    /// Operator (staff user) who rang up the sale.
    pub user_id: String,

    pub note: Option<String>,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
///
/// Snapshot pattern: sku/name/unit price are frozen at checkout so order
/// history survives later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,

    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,

    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,

    /// unit_price x quantity - discount.
    pub total_price_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An immutable record of a single change to a product's stock quantity.
///
/// `previous_stock` and `new_stock` are the true ledger values at the
/// moment of the change, read inside the same transaction as the write -
/// `previous_stock + quantity == new_stock` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,

    /// Signed delta: negative for sales, positive for receiving.
    pub quantity: i64,

    pub previous_stock: i64,
    pub new_stock: i64,

    /// Free-text reference, e.g. the order number for a sale.
    pub reference: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer
// =============================================================================

/// A loyalty customer.
///
/// The three counters are increment-only on the checkout path; completed
/// orders are the only core-scope mutator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,

    /// Business key: `MEM-<6 base36 chars>`, unique.
    pub member_code: String,

    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,

    /// One point per whole currency unit spent.
    pub loyalty_points: i64,

    pub total_spent_cents: i64,
    pub visit_count: i64,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    #[inline]
    pub fn total_spent(&self) -> Money {
        Money::from_cents(self.total_spent_cents)
    }
}

// =============================================================================
// Setting
// =============================================================================

/// A key/value configuration entry.
///
/// The checkout core reads the `tax_rate` key (a percentage) at
/// transaction time; the rate is whatever is current at that moment, not
/// pinned per-cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Audit Entry
// =============================================================================

/// An append-only audit record.
///
/// Independent lifecycle from the entities it describes; writing one must
/// never abort the operation being audited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEntry {
    pub id: String,

    /// Acting user; absent for anonymous failures.
    pub user_id: Option<String>,

    /// Action tag, e.g. "CREATE".
    pub action: String,

    /// Entity type, e.g. "order".
    pub entity: String,

    pub entity_id: Option<String>,

    /// Opaque JSON snapshot before the change.
    pub old_values: Option<String>,

    /// Opaque JSON snapshot after the change.
    pub new_values: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
        assert_eq!(TaxRate::from_percentage(10.0).bps(), 1000);
    }

    #[test]
    fn status_serde_names_are_screaming() {
        let json = serde_json::to_string(&OrderStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let json = serde_json::to_string(&PaymentMethod::Digital).unwrap();
        assert_eq!(json, "\"DIGITAL\"");
        let json = serde_json::to_string(&MovementType::Adjustment).unwrap();
        assert_eq!(json, "\"ADJUSTMENT\"");
    }

    #[test]
    fn low_stock_is_advisory_threshold() {
        let now = Utc::now();
        let product = Product {
            id: "p1".into(),
            sku: "COLA-330".into(),
            barcode: None,
            name: "Cola 330ml".into(),
            description: None,
            price_cents: 250,
            cost_cents: Some(120),
            stock_quantity: 5,
            min_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(product.is_low_stock());
    }
}
