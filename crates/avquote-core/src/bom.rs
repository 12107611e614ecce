//! # Bill of Materials
//!
//! Consolidated equipment list for ordering: every equipment line across the
//! quote, grouped by (item name, model, vendor).
//!
//! ```text
//!   Room "Huddle" ×4 ─ Display ×1 ─┐
//!                                   ├─► Display: 4×1 + 1×2 = 6
//!   Room "Board"  ×1 ─ Display ×2 ─┘
//! ```

use rust_decimal::Decimal;
use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{self, checked, times};
use crate::tree::QuoteTree;
use crate::types::Equipment;

/// Where some of an item's quantity comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct BomLocation {
    pub room_id: String,
    pub room_name: String,
    /// `None` for equipment attached directly to the room.
    pub system_name: Option<String>,
    pub line_quantity: i64,
    pub room_quantity: i64,
}

/// One consolidated item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct BomItem {
    pub item_name: String,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
    /// Σ line quantity × room quantity.
    pub quantity: i64,
    /// Unit cost of the first line seen for this item.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub unit_cost: Decimal,
    /// Σ line quantity × room quantity × line unit cost.
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub total_cost: Decimal,
    pub locations: Vec<BomLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct BillOfMaterials {
    pub quote_id: String,
    pub items: Vec<BomItem>,
    pub item_count: usize,
    pub total_quantity: i64,
    #[serde(serialize_with = "money::serialize_rounded")]
    #[ts(as = "String")]
    pub total_cost: Decimal,
}

fn too_large(field: &str) -> ValidationError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
}

fn same_item(item: &BomItem, line: &Equipment) -> bool {
    item.item_name == line.item_name && item.model == line.model && item.vendor == line.vendor
}

/// Builds the bill of materials. Items keep the order in which they first
/// appear in the tree.
///
/// ## Errors
/// `ValidationError::TooLarge` when a quantity or cost overflows.
pub fn build_bom(tree: &QuoteTree) -> CoreResult<BillOfMaterials> {
    let mut items: Vec<BomItem> = Vec::new();

    for room in &tree.rooms {
        let lines = room
            .systems
            .iter()
            .flat_map(|s| s.equipment.iter().map(move |e| (Some(&s.system.name), e)))
            .chain(room.equipment.iter().map(|e| (None, e)));

        for (system_name, line) in lines {
            let quantity = line
                .quantity
                .checked_mul(room.room.quantity)
                .ok_or_else(|| too_large("quantity"))?;
            let location = BomLocation {
                room_id: room.room.id.clone(),
                room_name: room.room.name.clone(),
                system_name: system_name.cloned(),
                line_quantity: line.quantity,
                room_quantity: room.room.quantity,
            };
            let cost = checked("total cost", times(line.unit_cost, quantity))?;

            match items.iter_mut().find(|item| same_item(item, line)) {
                Some(item) => {
                    item.quantity = item
                        .quantity
                        .checked_add(quantity)
                        .ok_or_else(|| too_large("quantity"))?;
                    item.total_cost = checked("total cost", item.total_cost.checked_add(cost))?;
                    item.locations.push(location);
                }
                None => items.push(BomItem {
                    item_name: line.item_name.clone(),
                    model: line.model.clone(),
                    vendor: line.vendor.clone(),
                    description: line.description.clone(),
                    quantity,
                    unit_cost: line.unit_cost,
                    total_cost: cost,
                    locations: vec![location],
                }),
            }
        }
    }

    let total_quantity = items
        .iter()
        .try_fold(0i64, |acc, i| acc.checked_add(i.quantity))
        .ok_or_else(|| too_large("total quantity"))?;
    let total_cost = checked("total cost", money::sum(items.iter().map(|i| i.total_cost)))?;

    Ok(BillOfMaterials {
        quote_id: tree.id().to_string(),
        item_count: items.len(),
        total_quantity,
        total_cost,
        items,
    })
}
