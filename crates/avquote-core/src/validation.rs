//! # Validation Module
//!
//! Input checks for values that enter the quote from outside: catalog rows,
//! template definitions, user-entered quantities.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  API layer          ── request shape, auth            (not in this repo)│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  THIS MODULE        ── names, quantities, money strings                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pricing / Roll-up  ── trusts its input; negative rates are priced     │
//! │       │                as given                                         │
//! │       ▼                                                                 │
//! │  SQLite             ── NOT NULL, UNIQUE, foreign keys                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use avquote_core::validation::{parse_money, validate_room_quantity};
//!
//! assert!(validate_room_quantity(4).is_ok());
//! assert_eq!(parse_money("price", "$1,299.50").unwrap().to_string(), "1299.50");
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_NAME_LENGTH, MAX_ROOM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (quote, room, system, item, template).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LENGTH`] characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a room quantity: 1 to [`MAX_ROOM_QUANTITY`].
pub fn validate_room_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ROOM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ROOM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a line quantity (equipment units): 1 to [`MAX_LINE_QUANTITY`].
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
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

/// Validates that a decimal is zero or more.
pub fn validate_non_negative(field: &str, value: Decimal) -> ValidationResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Parses a money cell as typed by a person or exported by a spreadsheet.
///
/// Accepts a leading `$`, thousands separators and surrounding whitespace.
/// The result must not be negative.
pub fn parse_money(field: &str, raw: &str) -> ValidationResult<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();

    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("'{}' is not a number", raw.trim()),
        })?;

    validate_non_negative(field, value)?;
    Ok(value)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "  Boardroom ").unwrap(), "Boardroom");
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_room_quantity() {
        assert!(validate_room_quantity(1).is_ok());
        assert!(validate_room_quantity(999).is_ok());

        assert!(validate_room_quantity(0).is_err());
        assert!(validate_room_quantity(-2).is_err());
        assert!(validate_room_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_line_quantity() {
        assert!(validate_line_quantity(12).is_ok());
        assert!(validate_line_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_line_quantity(0).is_err());
        assert!(matches!(
            validate_line_quantity(MAX_LINE_QUANTITY + 1),
            Err(ValidationError::OutOfRange { max: MAX_LINE_QUANTITY, .. })
        ));
        assert!(validate_line_quantity(i64::MAX / 2).is_err());
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("price", "1299.5").unwrap(), Decimal::new(12995, 1));
        assert_eq!(parse_money("price", " $1,299.50 ").unwrap(), Decimal::new(129950, 2));
        assert_eq!(parse_money("price", "0").unwrap(), Decimal::ZERO);

        assert!(matches!(
            parse_money("price", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            parse_money("price", "call for price"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            parse_money("price", "-5"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
