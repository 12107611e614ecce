//! # Roll-Up Aggregator
//!
//! Folds a [`QuoteTree`] into a [`FinancialSummary`].
//!
//! ## Two-Level Reduction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Per room, ONE instance:                                             │
//! │       equipment lines ─► equipment cost/price   (quote default markup) │
//! │       labor lines     ─► labor cost/price                               │
//! │       service lines   ─► services price         (uses equipment price) │
//! │                                                                         │
//! │  2. × room.quantity  ─► RoomSummary                                     │
//! │                                                                         │
//! │  3. Σ rooms          ─► QuoteTotals                                     │
//! │       tax         = Σ taxable equipment price × tax_rate / 100          │
//! │                     (0 when tax is disabled)                            │
//! │       grand_total = equipment + labor + services + tax                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rooms are independent, so the order they are visited in does not change
//! the result. An empty room summarizes to zeros. Negative rates and markups
//! are accepted as given.
//!
//! The summary holds full-precision values; its `Serialize` impl rounds each
//! figure to two places. A figure too large for a decimal fails the whole
//! summary with `ValidationError::TooLarge`.

use rust_decimal::Decimal;
use serde::Serialize;
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::{self, checked, ratio_percent, times};
use crate::pricing::{equipment_line_totals, labor_line_totals, service_line_totals, LineTotals};
use crate::tree::{QuoteTree, RoomNode, SystemNode};
use crate::types::Equipment;

// =============================================================================
// Summary Types
// =============================================================================

/// Equipment figures of one system, for a single room instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct SystemSummary {
    pub system_id: String,
    pub name: String,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub margin: Decimal,
}

/// Figures for one room, already multiplied by the room quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub quantity: i64,
    /// Per-system breakdown of one room instance.
    pub systems: Vec<SystemSummary>,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub labor_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub labor_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub services_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub services_price: Decimal,
    /// Equipment price of lines that are not tax exempt.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub taxable_equipment_price: Decimal,
    /// Equipment margin + labor margin + services margin.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub margin: Decimal,
}

/// Whole-quote totals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct QuoteTotals {
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub equipment_margin: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub labor_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub labor_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub labor_margin: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub services_cost: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub services_price: Decimal,
    /// Equipment + labor + services price, before tax.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub taxable_equipment_price: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub tax: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub grand_total: Decimal,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub total_margin: Decimal,
    /// `total_margin / grand_total × 100`, zero for an empty quote.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub margin_percent: Decimal,
}

/// Financial summary of a quote, per room and overall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct FinancialSummary {
    pub quote_id: String,
    pub rooms: Vec<RoomSummary>,
    pub totals: QuoteTotals,
}

// =============================================================================
// Aggregation
// =============================================================================

/// One room instance, before the quantity multiplier.
#[derive(Debug, Default, Clone, Copy)]
struct RoomFigures {
    equipment: LineTotals,
    labor: LineTotals,
    services: LineTotals,
    taxable_equipment_price: Decimal,
}

fn add(field: &str, a: Decimal, b: Decimal) -> CoreResult<Decimal> {
    Ok(checked(field, a.checked_add(b))?)
}

fn equipment_figures<'a, I>(lines: I, default_markup: Decimal) -> CoreResult<(LineTotals, Decimal)>
where
    I: IntoIterator<Item = &'a Equipment>,
{
    lines
        .into_iter()
        .try_fold((LineTotals::default(), Decimal::ZERO), |(totals, taxable), line| {
            let line_totals = equipment_line_totals(line, default_markup)?.totals;
            let taxable = if line.tax_exempt {
                taxable
            } else {
                add("taxable equipment price", taxable, line_totals.total_price)?
            };
            Ok((totals.plus(&line_totals)?, taxable))
        })
}

fn summarize_system(node: &SystemNode, default_markup: Decimal) -> CoreResult<SystemSummary> {
    let (totals, _) = equipment_figures(&node.equipment, default_markup)?;
    Ok(SystemSummary {
        system_id: node.system.id.clone(),
        name: node.system.name.clone(),
        equipment_cost: totals.total_cost,
        equipment_price: totals.total_price,
        margin: totals.margin_dollars,
    })
}

fn room_figures(node: &RoomNode, default_markup: Decimal) -> CoreResult<RoomFigures> {
    let (equipment, taxable_equipment_price) =
        equipment_figures(node.all_equipment(), default_markup)?;
    let labor = LineTotals::try_sum(node.labor.iter().map(labor_line_totals))?;
    let services = LineTotals::try_sum(
        node.services
            .iter()
            .map(|s| service_line_totals(s, equipment.total_price)),
    )?;

    Ok(RoomFigures {
        equipment,
        labor,
        services,
        taxable_equipment_price,
    })
}

pub fn summarize_room(node: &RoomNode, default_markup: Decimal) -> CoreResult<RoomSummary> {
    let unit = room_figures(node, default_markup)?;
    let qty = node.room.quantity;
    let equipment = unit.equipment.scaled(qty)?;
    let labor = unit.labor.scaled(qty)?;
    let services = unit.services.scaled(qty)?;

    let systems = node
        .systems
        .iter()
        .map(|s| summarize_system(s, default_markup))
        .collect::<CoreResult<Vec<_>>>()?;
    let margin = checked(
        "room margin",
        money::sum([
            equipment.margin_dollars,
            labor.margin_dollars,
            services.margin_dollars,
        ]),
    )?;

    Ok(RoomSummary {
        room_id: node.room.id.clone(),
        name: node.room.name.clone(),
        quantity: qty,
        systems,
        equipment_cost: equipment.total_cost,
        equipment_price: equipment.total_price,
        labor_cost: labor.total_cost,
        labor_price: labor.total_price,
        services_cost: services.total_cost,
        services_price: services.total_price,
        taxable_equipment_price: checked(
            "taxable equipment price",
            times(unit.taxable_equipment_price, qty),
        )?,
        margin,
    })
}

pub fn summarize(tree: &QuoteTree) -> CoreResult<FinancialSummary> {
    let quote = &tree.quote;
    let rooms = tree
        .rooms
        .iter()
        .map(|r| summarize_room(r, quote.equipment_markup_default))
        .collect::<CoreResult<Vec<_>>>()?;

    let mut totals = QuoteTotals::default();
    for r in &rooms {
        totals.equipment_cost = add("equipment cost", totals.equipment_cost, r.equipment_cost)?;
        totals.equipment_price = add("equipment price", totals.equipment_price, r.equipment_price)?;
        totals.labor_cost = add("labor cost", totals.labor_cost, r.labor_cost)?;
        totals.labor_price = add("labor price", totals.labor_price, r.labor_price)?;
        totals.services_cost = add("services cost", totals.services_cost, r.services_cost)?;
        totals.services_price = add("services price", totals.services_price, r.services_price)?;
        totals.taxable_equipment_price = add(
            "taxable equipment price",
            totals.taxable_equipment_price,
            r.taxable_equipment_price,
        )?;
        totals.total_margin = add("margin", totals.total_margin, r.margin)?;
    }

    totals.equipment_margin = checked(
        "equipment margin",
        totals.equipment_price.checked_sub(totals.equipment_cost),
    )?;
    totals.labor_margin = checked(
        "labor margin",
        totals.labor_price.checked_sub(totals.labor_cost),
    )?;
    totals.subtotal = checked(
        "subtotal",
        money::sum([
            totals.equipment_price,
            totals.labor_price,
            totals.services_price,
        ]),
    )?;
    totals.tax = checked(
        "tax",
        quote.tax_settings().tax_on(totals.taxable_equipment_price),
    )?;
    totals.grand_total = add("grand total", totals.subtotal, totals.tax)?;
    totals.margin_percent = checked(
        "margin percent",
        ratio_percent(totals.total_margin, totals.grand_total),
    )?;

    Ok(FinancialSummary {
        quote_id: tree.id().to_string(),
        rooms,
        totals,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use crate::types::{Labor, NewQuote, Quote, QuoteDefaults, Room, Service, System};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn empty_tree() -> QuoteTree {
        QuoteTree::new(Quote::new(
            NewQuote {
                name: "Conference Center".to_string(),
                client_name: "Acme".to_string(),
                department_id: "dept-av".to_string(),
                ..NewQuote::default()
            },
            &QuoteDefaults::default(),
            "user-1",
        ))
    }

    /// One room ×2 with 2 × $100 equipment and 10h of labor at 50/80.
    fn boardroom_tree(quantity: i64) -> (QuoteTree, String) {
        let mut tree = empty_tree();
        let room_id = tree.add_room(Room::new("", "Boardroom", quantity)).unwrap().room.id.clone();
        tree.add_equipment(Equipment::new(room_id.clone(), "DSP", 2, d("100")))
            .unwrap();
        tree.add_labor(Labor::new(room_id.clone(), "Installer", d("50"), d("80"), d("10")))
            .unwrap();
        (tree, room_id)
    }

    #[test]
    fn test_boardroom_scenario() {
        let (tree, _) = boardroom_tree(2);
        let summary = summarize(&tree).unwrap();
        let room = &summary.rooms[0];

        assert_eq!(room.equipment_price, d("480"));
        assert_eq!(room.equipment_cost, d("400"));
        assert_eq!(room.labor_price, d("1600"));
        assert_eq!(room.labor_cost, d("1000"));
        assert_eq!(room.margin, d("680"));

        let t = &summary.totals;
        assert_eq!(t.tax, d("38.4"));
        assert_eq!(t.subtotal, d("2080"));
        assert_eq!(t.grand_total, d("2118.4"));
        assert_eq!(t.total_margin, d("680"));
        assert_eq!(t.equipment_margin, d("80"));
        assert_eq!(t.labor_margin, d("600"));
    }

    #[test]
    fn test_room_quantity_is_linear() {
        let single = summarize(&boardroom_tree(1).0).unwrap();
        let triple = summarize(&boardroom_tree(3).0).unwrap();
        let three = Decimal::from(3);

        assert_eq!(triple.totals.equipment_price, single.totals.equipment_price * three);
        assert_eq!(triple.totals.labor_cost, single.totals.labor_cost * three);
        assert_eq!(triple.totals.total_margin, single.totals.total_margin * three);
        assert_eq!(triple.totals.tax, single.totals.tax * three);
    }

    #[test]
    fn test_tax_disabled_is_zero() {
        let (mut tree, _) = boardroom_tree(2);
        tree.quote.tax_enabled = false;
        tree.quote.tax_rate = d("12");

        let t = summarize(&tree).unwrap().totals;
        assert_eq!(t.tax, Decimal::ZERO);
        assert_eq!(t.grand_total, d("2080"));
    }

    #[test]
    fn test_tax_exempt_lines_are_untaxed() {
        let (mut tree, room_id) = boardroom_tree(1);
        tree.add_equipment(Equipment::new(room_id, "Rental Lift", 1, d("1000")).tax_exempt())
            .unwrap();

        let t = summarize(&tree).unwrap().totals;
        assert_eq!(t.equipment_price, d("1440"));
        assert_eq!(t.taxable_equipment_price, d("240"));
        assert_eq!(t.tax, d("19.2"));
    }

    #[test]
    fn test_percent_service_on_room_equipment() {
        let mut tree = empty_tree();
        let room_id = tree.add_room(Room::new("", "Auditorium", 1)).unwrap().room.id.clone();
        // 400 cost at 20% → 480 sell
        tree.add_equipment(Equipment::new(room_id.clone(), "Projector", 1, d("400")))
            .unwrap();
        tree.add_service(Service::percent_of_equipment(room_id, "Engineering", d("5")))
            .unwrap();

        let summary = summarize(&tree).unwrap();
        assert_eq!(summary.rooms[0].services_price, d("24"));
        // Pass-through: no margin
        assert_eq!(summary.rooms[0].margin, d("80"));
        assert_eq!(summary.totals.grand_total, d("480") + d("24") + d("38.4"));
    }

    #[test]
    fn test_service_with_cost_adds_margin() {
        let mut tree = empty_tree();
        let room_id = tree.add_room(Room::new("", "Lobby", 2)).unwrap().room.id.clone();
        tree.add_service(Service::flat(room_id, "Permit", d("150")).with_cost(d("100")))
            .unwrap();

        let summary = summarize(&tree).unwrap();
        assert_eq!(summary.rooms[0].services_price, d("300"));
        assert_eq!(summary.rooms[0].margin, d("100"));
    }

    #[test]
    fn test_systems_and_loose_equipment_both_count() {
        let mut tree = empty_tree();
        let room_id = tree.add_room(Room::new("", "Training", 2)).unwrap().room.id.clone();
        let system = System::new(room_id.clone(), "Audio");
        let system_id = system.id.clone();
        tree.add_system(system).unwrap();
        tree.add_equipment(Equipment::new(room_id.clone(), "Mic", 4, d("50")).in_system(system_id))
            .unwrap();
        tree.add_equipment(Equipment::new(room_id, "Rack", 1, d("300")))
            .unwrap();

        let room = &summarize(&tree).unwrap().rooms[0];
        assert_eq!(room.systems.len(), 1);
        // System figures are one instance
        assert_eq!(room.systems[0].equipment_price, d("240"));
        assert_eq!(room.systems[0].margin, d("40"));
        // Room figures include loose equipment, × 2
        assert_eq!(room.equipment_price, d("1200"));
    }

    #[test]
    fn test_empty_room_and_quote_are_zero() {
        let mut tree = empty_tree();
        let summary = summarize(&tree).unwrap();
        assert!(summary.rooms.is_empty());
        assert_eq!(summary.totals, QuoteTotals::default());

        tree.add_room(Room::new("", "Closet", 5)).unwrap();
        let summary = summarize(&tree).unwrap();
        assert_eq!(summary.rooms[0].equipment_price, Decimal::ZERO);
        assert_eq!(summary.totals.margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_negative_markup_is_accepted() {
        let mut tree = empty_tree();
        tree.quote.equipment_markup_default = d("-10");
        let room_id = tree.add_room(Room::new("", "Demo", 1)).unwrap().room.id.clone();
        tree.add_equipment(Equipment::new(room_id, "Display", 1, d("1000")))
            .unwrap();

        let t = summarize(&tree).unwrap().totals;
        assert_eq!(t.equipment_price, d("900"));
        assert_eq!(t.equipment_margin, d("-100"));
    }

    #[test]
    fn test_summary_serializes_rounded_strings() {
        let (tree, _) = boardroom_tree(2);
        let json = serde_json::to_value(summarize(&tree).unwrap()).unwrap();

        assert_eq!(json["totals"]["tax"], "38.40");
        assert_eq!(json["totals"]["grand_total"], "2118.40");
        assert_eq!(json["totals"]["margin_percent"], "32.10");
        assert_eq!(json["rooms"][0]["equipment_price"], "480.00");
        assert_eq!(json["rooms"][0]["quantity"], 2);
    }

    #[test]
    fn test_overflowing_room_fails_instead_of_panicking() {
        let mut tree = empty_tree();
        let room_id = tree.add_room(Room::new("", "Arena", 999)).unwrap().room.id.clone();
        tree.add_equipment(Equipment::new(room_id, "LED Wall", 1, d("1000000000")))
            .unwrap();
        // Bypasses the line quantity check, as a hand-built tree can.
        tree.rooms[0].equipment[0].quantity = i64::MAX;

        let err = summarize(&tree).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));
    }

    #[test]
    fn test_summary_carries_quote_id() {
        let (tree, _) = boardroom_tree(1);
        assert_eq!(summarize(&tree).unwrap().quote_id, tree.quote.id);
    }
}
