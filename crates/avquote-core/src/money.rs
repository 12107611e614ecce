//! # Money Module
//!
//! Decimal helpers for every monetary and percentage value in a quote.
//!
//! ## Precision Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUND ONCE, AT THE BOUNDARY                                            │
//! │                                                                         │
//! │  Line totals ──► Room totals ──► Quote totals ──► serialize (2 dp)      │
//! │   (full)          (full)          (full)           ▲                    │
//! │                                                    │                    │
//! │                                    only place rounding happens          │
//! │                                                                         │
//! │  Rounding each line first would make the quote total drift:             │
//! │    3 × 33.333… = 100.00   but   3 × round(33.333…) = 99.99              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Percentages are plain "per hundred" numbers: `20` means 20%.
//!
//! Arithmetic is checked. A helper returns `None` when the result does not
//! fit in a [`Decimal`], and [`checked`] turns that into a validation error
//! naming the figure being computed.
//!
//! ## Usage
//! ```rust
//! use avquote_core::money::{apply_markup, round_money};
//! use rust_decimal::Decimal;
//!
//! let unit_price = apply_markup(Decimal::from(100), Decimal::from(20));
//! assert_eq!(unit_price, Some(Decimal::from(120)));
//! assert_eq!(round_money(Decimal::new(166_666, 4)).to_string(), "16.67");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;

use crate::error::ValidationError;

/// Decimal places used at the presentation boundary.
pub const PRESENTATION_SCALE: u32 = 2;

/// 100, as a decimal.
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Returns `percent`% of `amount`.
#[inline]
pub fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent)?.checked_div(HUNDRED)
}

/// Adds a percentage markup on top of a cost: `cost × (1 + markup/100)`.
#[inline]
pub fn apply_markup(cost: Decimal, markup_percent: Decimal) -> Option<Decimal> {
    let factor = Decimal::ONE.checked_add(markup_percent.checked_div(HUNDRED)?)?;
    cost.checked_mul(factor)
}

/// `part / whole × 100`, defined as zero when `whole` is zero.
///
/// Used for margin percentages so an empty quote or a zero-price line never
/// divides by zero.
pub fn ratio_percent(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return Some(Decimal::ZERO);
    }
    part.checked_div(whole)?.checked_mul(HUNDRED)
}

/// `value × quantity`.
#[inline]
pub fn times(value: Decimal, quantity: i64) -> Option<Decimal> {
    value.checked_mul(Decimal::from(quantity))
}

/// Sums an iterator of decimals.
pub fn sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Unwraps the result of a checked operation on `field`.
///
/// ## Errors
/// `ValidationError::TooLarge` when the operation overflowed.
pub fn checked(field: &str, value: Option<Decimal>) -> Result<Decimal, ValidationError> {
    value.ok_or_else(|| ValidationError::TooLarge {
        field: field.to_string(),
    })
}

/// Rounds to cents (midpoint away from zero) and pins the scale to two
/// places, so `38.4` renders as `38.40`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(PRESENTATION_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(PRESENTATION_SCALE);
    rounded
}

// =============================================================================
// Presentation Serializers
// =============================================================================
// Summary types keep full precision in memory and use these to round at the
// point of serialization.

/// `serialize_with` target: rounds to 2 dp and writes a string ("2118.40").
pub fn serialize_rounded<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&round_money(*value).to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
