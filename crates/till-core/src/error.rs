//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Context in error messages (SKU, ID, amounts)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors: business rule violations or domain logic
/// failures, caught and translated to user-facing messages upstream.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Trying to sell more than available stock.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Payment is short of the order total.
    #[error("Insufficient payment: required {required_cents} cents, paid {paid_cents} cents")]
    InsufficientPayment {
        required_cents: i64,
        paid_cents: i64,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic or
/// persistence runs. Fully recoverable by resubmitting corrected input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Cart has no lines.
    #[error("cart must contain at least one item")]
    EmptyCart,

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A line's discount is larger than the line's subtotal.
    #[error(
        "discount {discount_cents} exceeds line subtotal {line_subtotal_cents} (line {line})"
    )]
    DiscountExceedsLineTotal {
        line: usize,
        line_subtotal_cents: i64,
        discount_cents: i64,
    },

    /// Combined discounts would push the taxable base negative.
    #[error("discount {discount_cents} exceeds cart subtotal {subtotal_cents}")]
    DiscountExceedsSubtotal {
        subtotal_cents: i64,
        discount_cents: i64,
    },

    /// Invalid format (e.g. invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "COLA-330".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COLA-330: available 3, requested 5"
        );
    }

    #[test]
    fn validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        assert_eq!(
            ValidationError::EmptyCart.to_string(),
            "cart must contain at least one item"
        );
    }

    #[test]
    fn validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
