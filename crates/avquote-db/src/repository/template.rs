//! # Template Repository
//!
//! Stored quote templates: preset labor, services and tax settings applied
//! to a room with [`QuoteRepository::apply_template`](super::quote::QuoteRepository::apply_template).

use avquote_core::QuoteTemplate;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use super::records::TemplateRecord;
use crate::error::{DbError, DbResult};

/// Repository for quote templates.
#[derive(Debug, Clone)]
pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
    /// Creates a new TemplateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TemplateRepository { pool }
    }

    /// Validates and stores a template.
    pub async fn create(&self, template: &QuoteTemplate) -> DbResult<()> {
        template.validate()?;

        let labor_json = encode_column("templates.labor_json", &template.labor)?;
        let services_json = encode_column("templates.services_json", &template.services)?;
        let tax_json = encode_column("templates.tax_json", &template.tax)?;

        debug!(template_id = %template.id, name = %template.name, "Creating template");

        sqlx::query(
            r#"
            INSERT INTO templates (
                id, name, department_id, labor_json, services_json, tax_json,
                created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&template.id)
        .bind(template.name.trim())
        .bind(&template.department_id)
        .bind(labor_json)
        .bind(services_json)
        .bind(tax_json)
        .bind(&template.created_by)
        .bind(template.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a template by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<QuoteTemplate>> {
        let sql = format!("SELECT {} FROM templates WHERE id = ?1", TemplateRecord::COLUMNS);

        let record: Option<TemplateRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        record.map(QuoteTemplate::try_from).transpose()
    }

    /// Lists templates by name.
    ///
    /// With `department_id`, returns that department's templates plus the
    /// ones shared by every department.
    pub async fn list(&self, department_id: Option<&str>) -> DbResult<Vec<QuoteTemplate>> {
        let sql = format!(
            "SELECT {} FROM templates \
             WHERE ?1 IS NULL OR department_id IS NULL OR department_id = ?1 \
             ORDER BY name",
            TemplateRecord::COLUMNS
        );

        let records: Vec<TemplateRecord> = sqlx::query_as(&sql)
            .bind(department_id)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(QuoteTemplate::try_from).collect()
    }

    /// Deletes a template. Quotes it was applied to keep their lines.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Template", id));
        }

        debug!(template_id = %id, "Template deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

/// Serializes a value for a JSON text column.
fn encode_column<T: Serialize + ?Sized>(column: &str, value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::encode(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use avquote_core::template::{TemplateLabor, TemplateService};
    use avquote_core::{NewQuote, Room, ServicePricing, TaxSettings};
    use rust_decimal::Decimal;

    fn conference_room_template(department_id: Option<&str>) -> QuoteTemplate {
        let mut template = QuoteTemplate::new(
            "Conference Room",
            TaxSettings {
                tax_rate: Decimal::new(725, 2),
                tax_enabled: true,
            },
            "ana",
        );
        template.department_id = department_id.map(str::to_string);
        template.labor.push(TemplateLabor {
            role_name: "Installer".to_string(),
            cost_rate: Decimal::from(45),
            sell_rate: Decimal::from(95),
            hours: Decimal::from(16),
            department_id: None,
        });
        template.services.push(TemplateService {
            service_name: "Programming".to_string(),
            pricing: ServicePricing::PercentOfEquipment {
                percent: Decimal::from(5),
            },
            cost: None,
            department_id: None,
            description: None,
        });
        template
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let template = conference_room_template(None);

        db.templates().create(&template).await.unwrap();
        let stored = db.templates().get(&template.id).await.unwrap().unwrap();

        assert_eq!(stored.labor, template.labor);
        assert_eq!(stored.services, template.services);
        assert_eq!(stored.tax, template.tax);

        db.templates().delete(&template.id).await.unwrap();
        assert!(db.templates().get(&template.id).await.unwrap().is_none());
        assert!(db.templates().delete(&template.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_template_is_not_stored() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut template = conference_room_template(None);
        template.name = " ".to_string();

        assert!(matches!(
            db.templates().create(&template).await,
            Err(DbError::Core(_))
        ));
        assert!(db.templates().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_department_includes_shared() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.templates().create(&conference_room_template(None)).await.unwrap();
        db.templates()
            .create(&conference_room_template(Some("dept-av")))
            .await
            .unwrap();
        db.templates()
            .create(&conference_room_template(Some("dept-lv")))
            .await
            .unwrap();

        assert_eq!(db.templates().list(None).await.unwrap().len(), 3);
        assert_eq!(db.templates().list(Some("dept-av")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_apply_stored_template_to_room() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let template = conference_room_template(None);
        db.templates().create(&template).await.unwrap();

        let quote_id = db
            .quotes()
            .create(
                NewQuote {
                    name: "Tower B".to_string(),
                    ..NewQuote::default()
                },
                "ana",
            )
            .await
            .unwrap()
            .quote
            .id;
        let tree = db
            .quotes()
            .mutate(&quote_id, "ana", |tree| {
                tree.add_room(Room::new("", "Conf 4A", 1))?;
                Ok(())
            })
            .await
            .unwrap();
        let room_id = tree.rooms[0].room.id.clone();

        let tree = db
            .quotes()
            .apply_template(&quote_id, &room_id, &template.id, "ana")
            .await
            .unwrap();

        assert_eq!(tree.quote.tax_rate, Decimal::new(725, 2));
        assert_eq!(tree.rooms[0].labor[0].role_name, "Installer");
        assert_eq!(tree.rooms[0].services.len(), 1);
        assert_eq!(tree.quote.version, 3);

        let err = db
            .quotes()
            .apply_template(&quote_id, &room_id, "no-such-template", "ana")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unencodable_column_is_an_encode_error() {
        use std::collections::HashMap;

        let mut bad: HashMap<(i32, i32), i32> = HashMap::new();
        bad.insert((1, 2), 3);

        let err = encode_column("templates.tax_json", &bad).unwrap_err();
        assert!(matches!(err, DbError::Encode { ref column, .. } if column == "templates.tax_json"));

        let tax = TaxSettings {
            tax_rate: Decimal::new(725, 2),
            tax_enabled: true,
        };
        assert_eq!(
            encode_column("templates.tax_json", &tax).unwrap(),
            r#"{"tax_rate":"7.25","tax_enabled":true}"#
        );
    }
}
