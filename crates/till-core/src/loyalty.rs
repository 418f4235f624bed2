//! # Loyalty Accrual
//!
//! Derives the customer counter increments earned by a completed order.
//! Pure derivation only - applying the increments is the persistence
//! layer's job, inside the same transaction as the order itself.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The increments a completed order earns for its attached customer.
///
/// All three counters are increment-only: points and spend never decrease
/// on the checkout path, and every completed order counts as one visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyAccrual {
    /// Added to `total_spent_cents`: the full order total.
    pub spent_cents: i64,

    /// Added to `loyalty_points`: one point per whole currency unit.
    pub points: i64,

    /// Added to `visit_count`: always 1 per order.
    pub visits: i64,
}

impl LoyaltyAccrual {
    /// Derives the accrual for an order total.
    ///
    /// Points are `floor(total)` in whole currency units - an order of
    /// $47.80 earns 47 points. A zero-total order still counts a visit.
    pub fn for_order_total(total: Money) -> Self {
        LoyaltyAccrual {
            spent_cents: total.cents(),
            points: total.whole_units(),
            visits: 1,
        }
    }
}
