//! # Pricing Calculator
//!
//! Line-level pricing for equipment, labor and services.
//!
//! ## Formulas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Equipment                                                              │
//! │    markup      = markup_override ?? quote.equipment_markup_default      │
//! │    unit_price  = unit_cost × (1 + markup / 100)                         │
//! │    total_price = unit_price × quantity                                  │
//! │    total_cost  = unit_cost  × quantity                                  │
//! │                                                                         │
//! │  Labor                                                                  │
//! │    total_price = sell_rate × hours                                      │
//! │    total_cost  = cost_rate × hours                                      │
//! │                                                                         │
//! │  Service                                                                │
//! │    Flat                 total_price = amount                            │
//! │    PercentOfEquipment   total_price = room equipment sell × pct / 100   │
//! │    total_cost  = cost ?? total_price      (pass-through, zero margin)   │
//! │                                                                         │
//! │  Every line                                                             │
//! │    margin_dollars = total_price − total_cost                            │
//! │    margin_percent = margin_dollars / total_price × 100   (0 if price 0) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is full precision. Rounding happens in the serializers.
//! A figure that overflows comes back as `ValidationError::TooLarge`.

use rust_decimal::Decimal;
use serde::Serialize;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{self, apply_markup, checked, percent_of, ratio_percent, times};
use crate::types::{Equipment, Labor, Service, ServicePricing};

// =============================================================================
// Line Totals
// =============================================================================

/// Cost, price and margin of one line (or of any group of lines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct LineTotals {
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub total_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub total_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub margin_dollars: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub margin_percent: Decimal,
}

impl LineTotals {
    /// Derives the margin fields from a cost and a price.
    pub fn from_cost_and_price(total_cost: Decimal, total_price: Decimal) -> CoreResult<Self> {
        let margin_dollars = checked("margin", total_price.checked_sub(total_cost))?;
        Ok(LineTotals {
            total_cost,
            total_price,
            margin_dollars,
            margin_percent: checked("margin percent", ratio_percent(margin_dollars, total_price))?,
        })
    }

    /// Multiplies every amount by `factor`. The margin percentage is unchanged.
    pub fn scaled(&self, factor: i64) -> CoreResult<Self> {
        LineTotals::from_cost_and_price(
            checked("total cost", times(self.total_cost, factor))?,
            checked("total price", times(self.total_price, factor))?,
        )
    }

    /// Adds two sets of totals and re-derives the margin.
    pub fn plus(&self, other: &LineTotals) -> CoreResult<Self> {
        LineTotals::from_cost_and_price(
            checked("total cost", self.total_cost.checked_add(other.total_cost))?,
            checked("total price", self.total_price.checked_add(other.total_price))?,
        )
    }

    /// Adds up line results, stopping at the first error.
    pub fn try_sum<I>(totals: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = CoreResult<LineTotals>>,
    {
        totals
            .into_iter()
            .try_fold(LineTotals::default(), |acc, t| acc.plus(&t?))
    }
}

/// Equipment line totals plus the resolved unit figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct EquipmentLineTotals {
    /// Markup actually used for the line, in percent.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub effective_markup: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub unit_price: Decimal,
    #[serde(flatten)]
    pub totals: LineTotals,
}

// =============================================================================
// Calculator
// =============================================================================

/// `unit_cost × (1 + markup_percent / 100)`.
#[inline]
pub fn unit_sell_price(unit_cost: Decimal, markup_percent: Decimal) -> CoreResult<Decimal> {
    Ok(checked("unit price", apply_markup(unit_cost, markup_percent))?)
}

/// The line's override when present, otherwise the quote default. Never a
/// blend of the two.
#[inline]
pub fn effective_markup(equipment: &Equipment, default_markup: Decimal) -> Decimal {
    equipment.markup_override.unwrap_or(default_markup)
}

/// Totals for one equipment line.
pub fn equipment_line_totals(
    equipment: &Equipment,
    default_markup: Decimal,
) -> CoreResult<EquipmentLineTotals> {
    let markup = effective_markup(equipment, default_markup);
    let unit_price = unit_sell_price(equipment.unit_cost, markup)?;

    Ok(EquipmentLineTotals {
        effective_markup: markup,
        unit_price,
        totals: LineTotals::from_cost_and_price(
            checked("equipment cost", times(equipment.unit_cost, equipment.quantity))?,
            checked("equipment price", times(unit_price, equipment.quantity))?,
        )?,
    })
}

/// Totals for one labor line.
pub fn labor_line_totals(labor: &Labor) -> CoreResult<LineTotals> {
    LineTotals::from_cost_and_price(
        checked("labor cost", labor.cost_rate.checked_mul(labor.hours))?,
        checked("labor price", labor.sell_rate.checked_mul(labor.hours))?,
    )
}

/// Totals for one service line.
///
/// `room_equipment_price` is the resolved (post-markup) equipment sell
/// subtotal of a single instance of the service's room.
pub fn service_line_totals(service: &Service, room_equipment_price: Decimal) -> CoreResult<LineTotals> {
    let total_price = match service.pricing {
        ServicePricing::Flat { amount } => amount,
        ServicePricing::PercentOfEquipment { percent } => {
            checked("service price", percent_of(room_equipment_price, percent))?
        }
    };
    let total_cost = service.cost.unwrap_or(total_price);
    LineTotals::from_cost_and_price(total_cost, total_price)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_equipment_default_markup() {
        let line = Equipment::new("room-1", "Amplifier", 2, d("100"));
        let t = equipment_line_totals(&line, d("20")).unwrap();

        assert_eq!(t.effective_markup, d("20"));
        assert_eq!(t.unit_price, d("120"));
        assert_eq!(t.totals.total_price, d("240"));
        assert_eq!(t.totals.total_cost, d("200"));
        assert_eq!(t.totals.margin_dollars, d("40"));
        assert_eq!(money::round_money(t.totals.margin_percent), d("16.67"));
        // Unrounded internally
        assert!(t.totals.margin_percent > d("16.6666"));
        assert!(t.totals.margin_percent < d("16.6667"));
    }

    #[test]
    fn test_override_replaces_default() {
        let line = Equipment::new("room-1", "Amplifier", 1, d("100")).with_markup_override(d("35"));

        let at_20 = equipment_line_totals(&line, d("20")).unwrap();
        let at_50 = equipment_line_totals(&line, d("50")).unwrap();

        assert_eq!(at_20.unit_price, d("135"));
        assert_eq!(at_20, at_50);
    }

    #[test]
    fn test_zero_override_is_respected() {
        let line = Equipment::new("room-1", "Cable", 10, d("3.5")).with_markup_override(Decimal::ZERO);
        let t = equipment_line_totals(&line, d("20")).unwrap();

        assert_eq!(t.totals.total_price, d("35"));
        assert_eq!(t.totals.margin_dollars, Decimal::ZERO);
    }

    #[test]
    fn test_zero_price_has_zero_margin_percent() {
        let line = Equipment::new("room-1", "Loaner", 1, Decimal::ZERO);
        let t = equipment_line_totals(&line, d("20")).unwrap();
        assert_eq!(t.totals.margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_labor_line() {
        let line = Labor::new("room-1", "Installer", d("50"), d("80"), d("10"));
        let t = labor_line_totals(&line).unwrap();

        assert_eq!(t.total_price, d("800"));
        assert_eq!(t.total_cost, d("500"));
        assert_eq!(t.margin_dollars, d("300"));
        assert_eq!(t.margin_percent, d("37.5"));
    }

    #[test]
    fn test_fractional_hours() {
        let line = Labor::new("room-1", "Programmer", d("60"), d("95"), d("2.25"));
        assert_eq!(labor_line_totals(&line).unwrap().total_price, d("213.75"));
    }

    #[test]
    fn test_percent_service() {
        let svc = Service::percent_of_equipment("room-1", "Project Management", d("5"));
        let t = service_line_totals(&svc, d("480")).unwrap();

        assert_eq!(t.total_price, d("24"));
        assert_eq!(t.margin_dollars, Decimal::ZERO);
    }

    #[test]
    fn test_flat_service_with_cost_has_margin() {
        let svc = Service::flat("room-1", "Freight", d("300")).with_cost(d("225"));
        let t = service_line_totals(&svc, d("999")).unwrap();

        assert_eq!(t.total_price, d("300"));
        assert_eq!(t.margin_dollars, d("75"));
        assert_eq!(t.margin_percent, d("25"));
    }

    #[test]
    fn test_scaled_and_sum() {
        let a = LineTotals::from_cost_and_price(d("200"), d("240")).unwrap();
        let b = LineTotals::from_cost_and_price(d("500"), d("800")).unwrap();

        let sum = LineTotals::try_sum([Ok(a), Ok(b)]).unwrap();
        assert_eq!(sum.total_price, d("1040"));
        assert_eq!(sum.margin_dollars, d("340"));

        let doubled = a.scaled(2).unwrap();
        assert_eq!(doubled.total_price, d("480"));
        assert_eq!(
            money::round_money(doubled.margin_percent),
            money::round_money(a.margin_percent)
        );
    }

    #[test]
    fn test_serialized_figures_are_rounded() {
        let line = Equipment::new("room-1", "Amplifier", 2, d("100"));
        let json = serde_json::to_value(equipment_line_totals(&line, d("20")).unwrap()).unwrap();

        assert_eq!(json["unit_price"], "120.00");
        assert_eq!(json["total_price"], "240.00");
        assert_eq!(json["margin_percent"], "16.67");
    }

    #[test]
    fn test_oversized_line_is_an_error() {
        let mut line = Equipment::new("room-1", "Amplifier", 1, d("100000000000"));
        line.quantity = i64::MAX;

        let err = equipment_line_totals(&line, d("20")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::TooLarge { ref field }) if field == "equipment cost"
        ));
    }

    #[test]
    fn test_scaling_past_decimal_range_is_an_error() {
        let big = LineTotals::from_cost_and_price(d("1000"), Decimal::MAX).unwrap();

        assert!(matches!(
            big.scaled(999),
            Err(CoreError::Validation(ValidationError::TooLarge { .. }))
        ));
        assert!(big.plus(&big).is_err());
    }
}
