//! # Pricing & Tax Calculator
//!
//! Pure totals computation for a cart: subtotal, discount, taxable base,
//! tax, total, change. Deterministic, no side effects - callable from the
//! checkout path and from any UI preview.
//!
//! ## Totals Model
//! ```text
//! subtotal     = sum(unit_price x quantity)       (discounts NOT folded in)
//! discount     = sum(line discounts) + order-level discount
//! taxable_base = subtotal - discount              (error if negative)
//! tax          = round_half_up(taxable_base x rate)
//! total        = taxable_base + tax
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Cart Line
// =============================================================================

/// One product entry in a not-yet-committed sale.
///
/// The unit price is a snapshot taken when the line entered the cart; it
/// may differ from the current catalog price and is authoritative for
/// subtotal computation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CartLine {
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub discount_cents: i64,
}

impl CartLine {
    /// Line subtotal before discount: unit price x quantity.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.unit_price_cents).times(self.quantity)
    }

    /// Line total after its own discount.
    #[inline]
    pub fn total(&self) -> Money {
        self.subtotal() - Money::from_cents(self.discount_cents)
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// The computed financial summary of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub taxable_base_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl CartTotals {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn taxable_base(&self) -> Money {
        Money::from_cents(self.taxable_base_cents)
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes cart totals for the given lines, order-level discount and tax
/// rate.
///
/// Rejects with [`ValidationError::DiscountExceedsSubtotal`] when the
/// combined discounts would push the taxable base negative; a negative
/// base is never clamped into a silently-wrong tax figure.
///
/// ## Example
/// ```rust
/// use till_core::pricing::{price_cart, CartLine};
/// use till_core::types::TaxRate;
///
/// let lines = [
///     CartLine { unit_price_cents: 200, quantity: 3, discount_cents: 0 },
///     CartLine { unit_price_cents: 150, quantity: 2, discount_cents: 50 },
/// ];
/// let totals = price_cart(&lines, 0, TaxRate::from_bps(1000)).unwrap();
/// assert_eq!(totals.total_cents, 935);
/// ```
pub fn price_cart(
    lines: &[CartLine],
    order_discount_cents: i64,
    tax_rate: TaxRate,
) -> Result<CartTotals, ValidationError> {
    let subtotal: Money = lines.iter().map(CartLine::subtotal).sum();
    let line_discounts: Money = lines
        .iter()
        .map(|l| Money::from_cents(l.discount_cents))
        .sum();
    let discount = line_discounts + Money::from_cents(order_discount_cents);

    let taxable_base = subtotal - discount;
    if taxable_base.is_negative() {
        return Err(ValidationError::DiscountExceedsSubtotal {
            subtotal_cents: subtotal.cents(),
            discount_cents: discount.cents(),
        });
    }

    let tax = taxable_base.tax(tax_rate);
    let total = taxable_base + tax;

    Ok(CartTotals {
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        taxable_base_cents: taxable_base.cents(),
        tax_cents: tax.cents(),
        total_cents: total.cents(),
    })
}

/// Change due for a payment: `amount_paid - total`.
///
/// Negative means the payment is short; the caller rejects that case
/// before anything is persisted.
#[inline]
pub fn change_due(amount_paid: Money, total: Money) -> Money {
    amount_paid - total
}

// =============================================================================
// Unit Tests
// =============================================================================
