//! # till-core: Pure Business Logic for Tillpoint
//!
//! The heart of the Tillpoint POS: all business logic as pure functions
//! with zero I/O dependencies.
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, StockMovement, Customer, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point)
//! - [`pricing`] - Cart totals: subtotal, discount, taxable base, tax, total
//! - [`loyalty`] - Loyalty accrual derived from a completed order
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output
//! 2. **No I/O**: database, network, file system access is forbidden here
//! 3. **Integer money**: all monetary values are cents (i64)
//! 4. **Explicit errors**: typed, never strings or panics
//!
//! ## Example
//!
//! ```rust
//! use till_core::pricing::{price_cart, CartLine};
//! use till_core::types::TaxRate;
//!
//! let lines = [CartLine { unit_price_cents: 850, quantity: 1, discount_cents: 0 }];
//! let totals = price_cart(&lines, 0, TaxRate::from_bps(1000)).unwrap();
//! assert_eq!(totals.tax_cents, 85);
//! assert_eq!(totals.total_cents, 935);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use loyalty::LoyaltyAccrual;
pub use money::Money;
pub use pricing::{price_cart, CartLine, CartTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches fat-finger entries (1000 instead of 10) before they reach the
/// stock ledger.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default tax rate in basis points when the `tax_rate` setting is absent
/// or unparseable: 10%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;
