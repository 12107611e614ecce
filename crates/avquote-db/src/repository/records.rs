//! Row structs for runtime `query_as` calls and their conversion into
//! domain types.
//!
//! Decimals are stored as TEXT; a value that no longer parses is reported as
//! [`DbError::Decode`] naming the column.

use std::str::FromStr;

use avquote_core::template::{TemplateLabor, TemplateService};
use avquote_core::{
    Equipment, Labor, Quote, QuoteStatus, QuoteTemplate, QuoteVersion, QuoteVersionSummary, Room,
    Service, ServicePricing, System, TaxSettings, VendorPrice,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub(crate) const PRICING_FLAT: &str = "flat";
pub(crate) const PRICING_PERCENT_OF_EQUIPMENT: &str = "percent_of_equipment";

fn parse_decimal(column: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|e| DbError::decode(column, e))
}

fn parse_decimal_opt(column: &str, raw: Option<String>) -> DbResult<Option<Decimal>> {
    raw.map(|r| parse_decimal(column, &r)).transpose()
}

/// Splits a service's pricing into the `(pricing_kind, pricing_value)` columns.
pub(crate) fn pricing_columns(pricing: &ServicePricing) -> (&'static str, String) {
    match pricing {
        ServicePricing::Flat { amount } => (PRICING_FLAT, amount.to_string()),
        ServicePricing::PercentOfEquipment { percent } => {
            (PRICING_PERCENT_OF_EQUIPMENT, percent.to_string())
        }
    }
}

// =============================================================================
// Quote Tree
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuoteRecord {
    pub id: String,
    pub name: String,
    pub client_name: String,
    pub department_id: String,
    pub project_address: Option<String>,
    pub description: Option<String>,
    pub status: QuoteStatus,
    pub version: i64,
    pub equipment_markup_default: String,
    pub tax_rate: String,
    pub tax_enabled: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuoteRecord {
    pub(crate) const COLUMNS: &'static str = "id, name, client_name, department_id, \
        project_address, description, status, version, equipment_markup_default, tax_rate, \
        tax_enabled, created_by, created_at, updated_at";
}

impl TryFrom<QuoteRecord> for Quote {
    type Error = DbError;

    fn try_from(r: QuoteRecord) -> DbResult<Self> {
        Ok(Quote {
            equipment_markup_default: parse_decimal(
                "quotes.equipment_markup_default",
                &r.equipment_markup_default,
            )?,
            tax_rate: parse_decimal("quotes.tax_rate", &r.tax_rate)?,
            id: r.id,
            name: r.name,
            client_name: r.client_name,
            department_id: r.department_id,
            project_address: r.project_address,
            description: r.description,
            status: r.status,
            version: r.version,
            tax_enabled: r.tax_enabled,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RoomRecord {
    pub id: String,
    pub quote_id: String,
    pub name: String,
    pub quantity: i64,
}

impl From<RoomRecord> for Room {
    fn from(r: RoomRecord) -> Self {
        Room {
            id: r.id,
            quote_id: r.quote_id,
            name: r.name,
            quantity: r.quantity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SystemRecord {
    pub id: String,
    pub room_id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<SystemRecord> for System {
    fn from(r: SystemRecord) -> Self {
        System {
            id: r.id,
            room_id: r.room_id,
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EquipmentRecord {
    pub id: String,
    pub room_id: String,
    pub system_id: Option<String>,
    pub item_name: String,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_cost: String,
    pub markup_override: Option<String>,
    pub tax_exempt: bool,
}

impl TryFrom<EquipmentRecord> for Equipment {
    type Error = DbError;

    fn try_from(r: EquipmentRecord) -> DbResult<Self> {
        Ok(Equipment {
            unit_cost: parse_decimal("equipment.unit_cost", &r.unit_cost)?,
            markup_override: parse_decimal_opt("equipment.markup_override", r.markup_override)?,
            id: r.id,
            room_id: r.room_id,
            system_id: r.system_id,
            item_name: r.item_name,
            model: r.model,
            vendor: r.vendor,
            description: r.description,
            quantity: r.quantity,
            tax_exempt: r.tax_exempt,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LaborRecord {
    pub id: String,
    pub room_id: String,
    pub role_name: String,
    pub cost_rate: String,
    pub sell_rate: String,
    pub hours: String,
    pub department_id: Option<String>,
}

impl TryFrom<LaborRecord> for Labor {
    type Error = DbError;

    fn try_from(r: LaborRecord) -> DbResult<Self> {
        Ok(Labor {
            cost_rate: parse_decimal("labor.cost_rate", &r.cost_rate)?,
            sell_rate: parse_decimal("labor.sell_rate", &r.sell_rate)?,
            hours: parse_decimal("labor.hours", &r.hours)?,
            id: r.id,
            room_id: r.room_id,
            role_name: r.role_name,
            department_id: r.department_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ServiceRecord {
    pub id: String,
    pub room_id: String,
    pub service_name: String,
    pub pricing_kind: String,
    pub pricing_value: String,
    pub cost: Option<String>,
    pub department_id: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<ServiceRecord> for Service {
    type Error = DbError;

    fn try_from(r: ServiceRecord) -> DbResult<Self> {
        let value = parse_decimal("services.pricing_value", &r.pricing_value)?;
        let pricing = match r.pricing_kind.as_str() {
            PRICING_FLAT => ServicePricing::Flat { amount: value },
            PRICING_PERCENT_OF_EQUIPMENT => ServicePricing::PercentOfEquipment { percent: value },
            other => {
                return Err(DbError::decode(
                    "services.pricing_kind",
                    format!("unknown pricing kind '{other}'"),
                ))
            }
        };

        Ok(Service {
            cost: parse_decimal_opt("services.cost", r.cost)?,
            id: r.id,
            room_id: r.room_id,
            service_name: r.service_name,
            pricing,
            department_id: r.department_id,
            description: r.description,
        })
    }
}

// =============================================================================
// Versions
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VersionRecord {
    pub id: String,
    pub quote_id: String,
    pub version: i64,
    pub payload: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<VersionRecord> for QuoteVersion {
    fn from(r: VersionRecord) -> Self {
        QuoteVersion {
            id: r.id,
            quote_id: r.quote_id,
            version: r.version,
            payload: r.payload,
            author: r.author,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VersionSummaryRecord {
    pub id: String,
    pub quote_id: String,
    pub version: i64,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<VersionSummaryRecord> for QuoteVersionSummary {
    fn from(r: VersionSummaryRecord) -> Self {
        QuoteVersionSummary {
            id: r.id,
            quote_id: r.quote_id,
            version: r.version,
            author: r.author,
            created_at: r.created_at,
        }
    }
}

// =============================================================================
// Catalog & Templates
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VendorPriceRecord {
    pub id: String,
    pub item_name: String,
    pub model: Option<String>,
    pub cost: String,
    pub description: Option<String>,
    pub vendor: String,
    pub department_id: Option<String>,
    pub all_departments: bool,
    pub imported_at: DateTime<Utc>,
}

impl VendorPriceRecord {
    pub(crate) const COLUMNS: &'static str = "id, item_name, model, cost, description, vendor, \
        department_id, all_departments, imported_at";
}

impl TryFrom<VendorPriceRecord> for VendorPrice {
    type Error = DbError;

    fn try_from(r: VendorPriceRecord) -> DbResult<Self> {
        Ok(VendorPrice {
            cost: parse_decimal("vendor_prices.cost", &r.cost)?,
            id: r.id,
            item_name: r.item_name,
            model: r.model,
            description: r.description,
            vendor: r.vendor,
            department_id: r.department_id,
            all_departments: r.all_departments,
            imported_at: r.imported_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TemplateRecord {
    pub id: String,
    pub name: String,
    pub department_id: Option<String>,
    pub labor_json: String,
    pub services_json: String,
    pub tax_json: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TemplateRecord {
    pub(crate) const COLUMNS: &'static str = "id, name, department_id, labor_json, \
        services_json, tax_json, created_by, created_at";
}

impl TryFrom<TemplateRecord> for QuoteTemplate {
    type Error = DbError;

    fn try_from(r: TemplateRecord) -> DbResult<Self> {
        let labor: Vec<TemplateLabor> = serde_json::from_str(&r.labor_json)
            .map_err(|e| DbError::decode("templates.labor_json", e))?;
        let services: Vec<TemplateService> = serde_json::from_str(&r.services_json)
            .map_err(|e| DbError::decode("templates.services_json", e))?;
        let tax: TaxSettings = serde_json::from_str(&r.tax_json)
            .map_err(|e| DbError::decode("templates.tax_json", e))?;

        Ok(QuoteTemplate {
            id: r.id,
            name: r.name,
            department_id: r.department_id,
            labor,
            services,
            tax,
            created_by: r.created_by,
            created_at: r.created_at,
        })
    }
}
