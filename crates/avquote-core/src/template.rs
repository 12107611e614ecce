//! # Quote Templates
//!
//! Reusable labor and service packages plus tax settings, applied to a room
//! of a quote in one step.
//!
//! ```text
//!   QuoteTemplate "Standard Conference Room"
//!   ├── tax: 8.25%, enabled          ─► copied onto the quote
//!   ├── labor: Installer 8h, PM 2h   ─► appended to the room (fresh ids)
//!   └── services: Freight 3%         ─► appended to the room (fresh ids)
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::tree::QuoteTree;
use crate::types::{new_id, Labor, Service, ServicePricing, TaxSettings};
use crate::validation::{validate_name, validate_non_negative, ValidationResult};

/// A labor line without a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemplateLabor {
    pub role_name: String,
    #[ts(as = "String")]
    pub cost_rate: Decimal,
    #[ts(as = "String")]
    pub sell_rate: Decimal,
    #[ts(as = "String")]
    pub hours: Decimal,
    pub department_id: Option<String>,
}

/// A service line without a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TemplateService {
    pub service_name: String,
    pub pricing: ServicePricing,
    #[ts(as = "Option<String>")]
    pub cost: Option<Decimal>,
    pub department_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteTemplate {
    pub id: String,
    pub name: String,
    pub department_id: Option<String>,
    pub labor: Vec<TemplateLabor>,
    pub services: Vec<TemplateService>,
    pub tax: TaxSettings,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl QuoteTemplate {
    /// A new, empty template.
    pub fn new(name: impl Into<String>, tax: TaxSettings, created_by: impl Into<String>) -> Self {
        QuoteTemplate {
            id: new_id(),
            name: name.into(),
            department_id: None,
            labor: Vec::new(),
            services: Vec::new(),
            tax,
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Checks names and amounts before the template is stored.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_non_negative("tax_rate", self.tax.tax_rate)?;
        for line in &self.labor {
            validate_name("role_name", &line.role_name)?;
            validate_non_negative("hours", line.hours)?;
        }
        for line in &self.services {
            validate_name("service_name", &line.service_name)?;
        }
        Ok(())
    }
}

impl TemplateLabor {
    fn instantiate(&self, room_id: &str) -> Labor {
        Labor {
            department_id: self.department_id.clone(),
            ..Labor::new(
                room_id,
                self.role_name.clone(),
                self.cost_rate,
                self.sell_rate,
                self.hours,
            )
        }
    }
}

impl TemplateService {
    fn instantiate(&self, room_id: &str) -> Service {
        Service {
            cost: self.cost,
            department_id: self.department_id.clone(),
            description: self.description.clone(),
            ..Service::new(room_id, self.service_name.clone(), self.pricing.clone())
        }
    }
}

impl QuoteTree {
    /// Applies `template` to a room: sets the quote's tax settings and appends
    /// the template's labor and service lines.
    pub fn apply_template(&mut self, room_id: &str, template: &QuoteTemplate) -> CoreResult<()> {
        // Fail before touching the quote if the room is unknown
        if self.room(room_id).is_none() {
            return Err(CoreError::not_found("Room", room_id));
        }

        self.quote.tax_rate = template.tax.tax_rate;
        self.quote.tax_enabled = template.tax.tax_enabled;
        for line in &template.labor {
            self.add_labor(line.instantiate(room_id))?;
        }
        for line in &template.services {
            self.add_service(line.instantiate(room_id))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewQuote, Quote, QuoteDefaults, Room};
    use std::str::FromStr;

    fn template() -> QuoteTemplate {
        let mut t = QuoteTemplate::new(
            "Standard Conference Room",
            TaxSettings {
                tax_rate: Decimal::from_str("8.25").unwrap(),
                tax_enabled: true,
            },
            "user-1",
        );
        t.labor.push(TemplateLabor {
            role_name: "Installer".to_string(),
            cost_rate: Decimal::from(45),
            sell_rate: Decimal::from(85),
            hours: Decimal::from(8),
            department_id: Some("dept-install".to_string()),
        });
        t.services.push(TemplateService {
            service_name: "Freight".to_string(),
            pricing: ServicePricing::PercentOfEquipment {
                percent: Decimal::from(3),
            },
            cost: None,
            department_id: None,
            description: None,
        });
        t
    }

    fn tree() -> QuoteTree {
        QuoteTree::new(Quote::new(
            NewQuote {
                name: "Branch rollout".to_string(),
                tax_enabled: Some(false),
                ..NewQuote::default()
            },
            &QuoteDefaults::default(),
            "user-1",
        ))
    }

    #[test]
    fn test_apply_template_adds_lines_and_tax() {
        let mut tree = tree();
        let room_id = tree.add_room(Room::new("", "Conf A", 1)).unwrap().room.id.clone();
        let template = template();

        tree.apply_template(&room_id, &template).unwrap();
        tree.apply_template(&room_id, &template).unwrap();

        assert!(tree.quote.tax_enabled);
        assert_eq!(tree.quote.tax_rate, Decimal::from_str("8.25").unwrap());

        let room = tree.room(&room_id).unwrap();
        assert_eq!(room.labor.len(), 2);
        assert_eq!(room.services.len(), 2);
        assert_ne!(room.labor[0].id, room.labor[1].id);
        assert_eq!(room.labor[0].room_id, room_id);
        assert_eq!(room.labor[0].department_id.as_deref(), Some("dept-install"));
    }

    #[test]
    fn test_apply_template_to_unknown_room_changes_nothing() {
        let mut tree = tree();
        let err = tree.apply_template("missing", &template()).unwrap_err();

        assert!(err.is_not_found());
        assert!(!tree.quote.tax_enabled);
    }

    #[test]
    fn test_validate() {
        assert!(template().validate().is_ok());

        let mut bad = template();
        bad.labor[0].hours = Decimal::from(-1);
        assert!(bad.validate().is_err());

        let mut unnamed = template();
        unnamed.name = "  ".to_string();
        assert!(unnamed.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_pricing_kind() {
        let t = template();
        let json = serde_json::to_string(&t.services).unwrap();
        let back: Vec<TemplateService> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t.services);
    }
}
