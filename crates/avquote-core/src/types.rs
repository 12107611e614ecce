//! # Domain Types
//!
//! Core domain types for quotes and their line items.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Quote Ownership                                 │
//! │                                                                         │
//! │  Quote ─┬─ Room (quantity = N identical rooms)                          │
//! │         │    ├─ System ── Equipment*                                    │
//! │         │    ├─ Equipment* (loose, no system)                           │
//! │         │    ├─ Labor*                                                  │
//! │         │    └─ Service*                                                │
//! │         └─ Room ...                                                     │
//! │                                                                         │
//! │  QuoteVersion ── immutable snapshot of the tree above, keyed by        │
//! │                  (quote_id, version). Outlives the live quote.          │
//! │                                                                         │
//! │  VendorPrice ── reference catalog; equipment copies values, no link.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is keyed by a UUID v4 string and refers to its parent by id,
//! never by reference; the owned tree lives in [`crate::tree`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::percent_of;

/// Generates a new entity id.
#[inline]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Quote Status
// =============================================================================

/// Flat status field of a quote.
///
/// There is no workflow: any status may be set from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Being priced.
    #[default]
    Draft,
    /// Sent to the client, awaiting an answer.
    Pending,
    /// Accepted by the client.
    Approved,
    /// Declined by the client.
    Rejected,
    /// Sent back for changes.
    Revision,
}

impl QuoteStatus {
    /// All statuses, in display order.
    pub const ALL: [QuoteStatus; 5] = [
        QuoteStatus::Draft,
        QuoteStatus::Pending,
        QuoteStatus::Approved,
        QuoteStatus::Rejected,
        QuoteStatus::Revision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Pending => "pending",
            QuoteStatus::Approved => "approved",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Revision => "revision",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        QuoteStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: QuoteStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Quote Defaults & Tax Settings
// =============================================================================

/// Pricing defaults applied to newly created quotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteDefaults {
    /// Default equipment markup in percent.
    pub equipment_markup: Decimal,
    /// Default tax rate in percent.
    pub tax_rate: Decimal,
    pub tax_enabled: bool,
}

impl Default for QuoteDefaults {
    fn default() -> Self {
        QuoteDefaults {
            equipment_markup: Decimal::from(20),
            tax_rate: Decimal::from(8),
            tax_enabled: true,
        }
    }
}

/// Tax configuration carried by quotes and templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSettings {
    /// Percent of the taxable equipment sell subtotal.
    #[ts(as = "String")]
    pub tax_rate: Decimal,
    pub tax_enabled: bool,
}

impl TaxSettings {
    /// Tax due on a taxable sell amount. Zero when tax is disabled; `None`
    /// on overflow.
    pub fn tax_on(&self, taxable: Decimal) -> Option<Decimal> {
        if !self.tax_enabled {
            return Some(Decimal::ZERO);
        }
        percent_of(taxable, self.tax_rate)
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Header row of a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quote {
    pub id: String,
    pub name: String,
    pub client_name: String,
    /// Owning department.
    pub department_id: String,
    pub project_address: Option<String>,
    pub description: Option<String>,
    pub status: QuoteStatus,
    /// Number of recorded versions. Zero until first persisted.
    pub version: i64,
    /// Markup in percent used by every equipment line without an override.
    #[ts(as = "String")]
    pub equipment_markup_default: Decimal,
    /// Tax rate in percent.
    #[ts(as = "String")]
    pub tax_rate: Decimal,
    pub tax_enabled: bool,
    /// User who created the quote.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a quote. Unset pricing fields fall back to
/// [`QuoteDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQuote {
    pub name: String,
    pub client_name: String,
    pub department_id: String,
    pub project_address: Option<String>,
    pub description: Option<String>,
    pub equipment_markup_default: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub tax_enabled: Option<bool>,
}

impl Quote {
    /// Builds an unsaved quote (version 0) from user input.
    pub fn new(input: NewQuote, defaults: &QuoteDefaults, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Quote {
            id: new_id(),
            name: input.name,
            client_name: input.client_name,
            department_id: input.department_id,
            project_address: input.project_address,
            description: input.description,
            status: QuoteStatus::Draft,
            version: 0,
            equipment_markup_default: input
                .equipment_markup_default
                .unwrap_or(defaults.equipment_markup),
            tax_rate: input.tax_rate.unwrap_or(defaults.tax_rate),
            tax_enabled: input.tax_enabled.unwrap_or(defaults.tax_enabled),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Current tax settings.
    pub fn tax_settings(&self) -> TaxSettings {
        TaxSettings {
            tax_rate: self.tax_rate,
            tax_enabled: self.tax_enabled,
        }
    }
}

/// Partial update of a quote header. `None` leaves a field untouched.
///
/// The optional header fields take `Some(None)` to clear them. In JSON an
/// absent key leaves the field alone and `null` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteUpdate {
    pub name: Option<String>,
    pub client_name: Option<String>,
    pub department_id: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub project_address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    pub status: Option<QuoteStatus>,
    pub equipment_markup_default: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub tax_enabled: Option<bool>,
}

impl QuoteUpdate {
    /// Applies every set field to `quote`.
    pub fn apply(self, quote: &mut Quote) {
        if let Some(name) = self.name {
            quote.name = name;
        }
        if let Some(client_name) = self.client_name {
            quote.client_name = client_name;
        }
        if let Some(department_id) = self.department_id {
            quote.department_id = department_id;
        }
        if let Some(address) = self.project_address {
            quote.project_address = address;
        }
        if let Some(description) = self.description {
            quote.description = description;
        }
        if let Some(status) = self.status {
            quote.status = status;
        }
        if let Some(markup) = self.equipment_markup_default {
            quote.equipment_markup_default = markup;
        }
        if let Some(rate) = self.tax_rate {
            quote.tax_rate = rate;
        }
        if let Some(enabled) = self.tax_enabled {
            quote.tax_enabled = enabled;
        }
    }
}

/// Maps a present key to `Some`, so `null` becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Room & System
// =============================================================================

/// A room of the installation. `quantity` rooms are priced identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Room {
    pub id: String,
    pub quote_id: String,
    pub name: String,
    /// Multiplier: N identical rooms.
    pub quantity: i64,
}

impl Room {
    pub fn new(quote_id: impl Into<String>, name: impl Into<String>, quantity: i64) -> Self {
        Room {
            id: new_id(),
            quote_id: quote_id.into(),
            name: name.into(),
            quantity,
        }
    }
}

/// A system inside a room (e.g. "Video Conferencing").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct System {
    pub id: String,
    pub room_id: String,
    pub name: String,
    pub description: Option<String>,
}

impl System {
    pub fn new(room_id: impl Into<String>, name: impl Into<String>) -> Self {
        System {
            id: new_id(),
            room_id: room_id.into(),
            name: name.into(),
            description: None,
        }
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// An equipment line.
///
/// `system_id` is `None` for equipment attached directly to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Equipment {
    pub id: String,
    pub room_id: String,
    pub system_id: Option<String>,
    pub item_name: String,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    #[ts(as = "String")]
    pub unit_cost: Decimal,
    /// Replaces the quote's default markup for this line when set.
    #[ts(as = "Option<String>")]
    pub markup_override: Option<Decimal>,
    pub tax_exempt: bool,
}

impl Equipment {
    pub fn new(
        room_id: impl Into<String>,
        item_name: impl Into<String>,
        quantity: i64,
        unit_cost: Decimal,
    ) -> Self {
        Equipment {
            id: new_id(),
            room_id: room_id.into(),
            system_id: None,
            item_name: item_name.into(),
            model: None,
            vendor: None,
            description: None,
            quantity,
            unit_cost,
            markup_override: None,
            tax_exempt: false,
        }
    }

    /// Copies a catalog entry into a new line. The line keeps no link to
    /// the catalog row.
    pub fn from_vendor_price(room_id: impl Into<String>, price: &VendorPrice, quantity: i64) -> Self {
        Equipment {
            model: price.model.clone(),
            vendor: Some(price.vendor.clone()),
            description: price.description.clone(),
            ..Equipment::new(room_id, price.item_name.clone(), quantity, price.cost)
        }
    }

    /// Places the line inside a system.
    pub fn in_system(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }

    pub fn with_markup_override(mut self, markup: Decimal) -> Self {
        self.markup_override = Some(markup);
        self
    }

    pub fn tax_exempt(mut self) -> Self {
        self.tax_exempt = true;
        self
    }
}

/// A labor line: hours of a role at a cost rate and a sell rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Labor {
    pub id: String,
    pub room_id: String,
    pub role_name: String,
    #[ts(as = "String")]
    pub cost_rate: Decimal,
    #[ts(as = "String")]
    pub sell_rate: Decimal,
    #[ts(as = "String")]
    pub hours: Decimal,
    /// Department whose rate card the role comes from.
    pub department_id: Option<String>,
}

impl Labor {
    pub fn new(
        room_id: impl Into<String>,
        role_name: impl Into<String>,
        cost_rate: Decimal,
        sell_rate: Decimal,
        hours: Decimal,
    ) -> Self {
        Labor {
            id: new_id(),
            room_id: room_id.into(),
            role_name: role_name.into(),
            cost_rate,
            sell_rate,
            hours,
            department_id: None,
        }
    }
}

/// How a third-party service is priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServicePricing {
    /// Fixed price to the client.
    Flat {
        #[ts(as = "String")]
        amount: Decimal,
    },
    /// Percent of the room's resolved equipment sell subtotal.
    PercentOfEquipment {
        #[ts(as = "String")]
        percent: Decimal,
    },
}

/// A third-party pass-through service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Service {
    pub id: String,
    pub room_id: String,
    pub service_name: String,
    pub pricing: ServicePricing,
    /// What the provider charges us. Without it the service has zero margin.
    #[ts(as = "Option<String>")]
    pub cost: Option<Decimal>,
    pub department_id: Option<String>,
    pub description: Option<String>,
}

impl Service {
    pub fn new(
        room_id: impl Into<String>,
        service_name: impl Into<String>,
        pricing: ServicePricing,
    ) -> Self {
        Service {
            id: new_id(),
            room_id: room_id.into(),
            service_name: service_name.into(),
            pricing,
            cost: None,
            department_id: None,
            description: None,
        }
    }

    /// Service priced as a percentage of the room's equipment sell price.
    pub fn percent_of_equipment(
        room_id: impl Into<String>,
        service_name: impl Into<String>,
        percent: Decimal,
    ) -> Self {
        Service::new(room_id, service_name, ServicePricing::PercentOfEquipment { percent })
    }

    /// Service at a flat price.
    pub fn flat(room_id: impl Into<String>, service_name: impl Into<String>, amount: Decimal) -> Self {
        Service::new(room_id, service_name, ServicePricing::Flat { amount })
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }
}

// =============================================================================
// Vendor Price Catalog
// =============================================================================

/// A vendor catalog entry. Not part of any quote tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VendorPrice {
    pub id: String,
    pub item_name: String,
    pub model: Option<String>,
    #[ts(as = "String")]
    pub cost: Decimal,
    pub description: Option<String>,
    pub vendor: String,
    pub department_id: Option<String>,
    /// Visible to every department.
    pub all_departments: bool,
    #[ts(as = "String")]
    pub imported_at: DateTime<Utc>,
}

// =============================================================================
// Quote Versions
// =============================================================================

/// An immutable, recorded version of a quote.
///
/// `payload` is the JSON encoding of a [`crate::snapshot::QuoteSnapshot`];
/// storage treats it as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteVersion {
    pub id: String,
    pub quote_id: String,
    /// 1, 2, 3, … per quote, no gaps.
    pub version: i64,
    pub payload: String,
    /// User who made the change.
    pub author: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A version row without its payload, for history listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteVersionSummary {
    pub id: String,
    pub quote_id: String,
    pub version: i64,
    pub author: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl From<&QuoteVersion> for QuoteVersionSummary {
    fn from(v: &QuoteVersion) -> Self {
        QuoteVersionSummary {
            id: v.id.clone(),
            quote_id: v.quote_id.clone(),
            version: v.version,
            author: v.author.clone(),
            created_at: v.created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
