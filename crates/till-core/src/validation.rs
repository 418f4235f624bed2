//! # Validation Module
//!
//! Business rule validation for checkout input. These checks run before
//! any persistence: a cart that fails here has touched nothing.

use crate::error::ValidationError;
use crate::pricing::CartLine;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Cart Validators
// =============================================================================

/// Validates a full set of cart lines for checkout.
///
/// ## Rules
/// - At least one line, at most `MAX_CART_LINES`
/// - Every quantity positive and at most `MAX_LINE_QUANTITY`
/// - Every unit price non-negative
/// - Every discount non-negative and at most the line subtotal
pub fn validate_cart_lines(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    if lines.len() > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }

    for (index, line) in lines.iter().enumerate() {
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price_cents)?;
        validate_line_discount(index, line)?;
    }

    Ok(())
}

fn validate_line_discount(index: usize, line: &CartLine) -> ValidationResult<()> {
    if line.discount_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount".to_string(),
        });
    }

    let line_subtotal = line.subtotal().cents();
    if line.discount_cents > line_subtotal {
        return Err(ValidationError::DiscountExceedsLineTotal {
            line: index,
            line_subtotal_cents: line_subtotal,
            discount_cents: line.discount_cents,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: positive, at most `MAX_LINE_QUANTITY`.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents: non-negative (zero allowed for free items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates an order-level discount: non-negative.
pub fn validate_order_discount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "discountAmount".to_string(),
        });
    }

    Ok(())
}

/// Validates an amount paid: non-negative.
///
/// Zero is allowed here so a fully-discounted cart can check out;
/// sufficiency against the total is the coordinator's check.
pub fn validate_amount_paid(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "amountPaid".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU: non-empty, at most 50 chars, alphanumeric plus
/// hyphen/underscore.
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::OutOfRange {
            field: "sku".to_string(),
            min: 1,
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
