//! # Vendor Price Repository
//!
//! Catalog of vendor prices imported from spreadsheets. Entries are copied
//! into quotes by value (see `Equipment::from_vendor_price`); editing the
//! catalog never changes an existing quote.

use avquote_core::catalog::{import_rows, ColumnMapping, ImportOutcome, ImportSource};
use avquote_core::VendorPrice;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::begin_write;
use super::records::VendorPriceRecord;
use crate::error::DbResult;

/// Repository for vendor catalog operations.
#[derive(Debug, Clone)]
pub struct VendorPriceRepository {
    pool: SqlitePool,
}

impl VendorPriceRepository {
    /// Creates a new VendorPriceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VendorPriceRepository { pool }
    }

    /// Inserts catalog entries in a single transaction.
    ///
    /// ## Returns
    /// Number of rows inserted.
    pub async fn insert_many(&self, prices: &[VendorPrice]) -> DbResult<usize> {
        let mut tx = begin_write(&self.pool).await?;

        for price in prices {
            sqlx::query(
                r#"
                INSERT INTO vendor_prices (
                    id, item_name, model, cost, description, vendor,
                    department_id, all_departments, imported_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&price.id)
            .bind(&price.item_name)
            .bind(&price.model)
            .bind(price.cost.to_string())
            .bind(&price.description)
            .bind(&price.vendor)
            .bind(&price.department_id)
            .bind(price.all_departments)
            .bind(price.imported_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count = prices.len(), "Vendor prices inserted");
        Ok(prices.len())
    }

    /// Parses spreadsheet rows and stores every valid one.
    ///
    /// Row problems do not abort the import; they are returned in the
    /// outcome. Fails only if the mapping names a column the header row
    /// lacks, or on storage errors.
    pub async fn import(
        &self,
        headers: &[Option<String>],
        rows: &[Vec<Option<String>>],
        mapping: &ColumnMapping,
        source: &ImportSource,
    ) -> DbResult<ImportOutcome> {
        let outcome = import_rows(headers, rows, mapping, source, Utc::now())?;

        self.insert_many(&outcome.prices).await?;

        if outcome.error_count > 0 {
            warn!(
                vendor = %source.vendor,
                errors = outcome.error_count,
                "Vendor import skipped invalid rows"
            );
        }
        info!(
            vendor = %source.vendor,
            imported = outcome.prices.len(),
            skipped = outcome.skipped,
            "Vendor prices imported"
        );

        Ok(outcome)
    }

    /// Most recently imported entries first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<VendorPrice>> {
        let sql = format!(
            "SELECT {} FROM vendor_prices ORDER BY imported_at DESC, item_name LIMIT ?1",
            VendorPriceRecord::COLUMNS
        );

        let records: Vec<VendorPriceRecord> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(VendorPrice::try_from).collect()
    }

    /// Entries whose item name or description contains `query`
    /// (case-insensitive for ASCII).
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<VendorPrice>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_recent(limit).await;
        }

        let sql = format!(
            "SELECT {} FROM vendor_prices \
             WHERE item_name LIKE '%' || ?1 || '%' ESCAPE '\\' \
                OR description LIKE '%' || ?1 || '%' ESCAPE '\\' \
             ORDER BY item_name, imported_at DESC LIMIT ?2",
            VendorPriceRecord::COLUMNS
        );

        let records: Vec<VendorPriceRecord> = sqlx::query_as(&sql)
            .bind(escape_like(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(VendorPrice::try_from).collect()
    }

    /// Gets a catalog entry by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<VendorPrice>> {
        let sql = format!(
            "SELECT {} FROM vendor_prices WHERE id = ?1",
            VendorPriceRecord::COLUMNS
        );

        let record: Option<VendorPriceRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        record.map(VendorPrice::try_from).transpose()
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use rust_decimal::Decimal;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            item_name: "Item".to_string(),
            price: "Cost".to_string(),
            description: Some("Notes".to_string()),
            model: Some("Model".to_string()),
        }
    }

    fn source() -> ImportSource {
        ImportSource {
            vendor: "Crestron".to_string(),
            department_id: Some("dept-av".to_string()),
            all_departments: false,
        }
    }

    #[tokio::test]
    async fn test_import_stores_valid_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let headers = cells(&["Item", "Model", "Cost", "Notes"]);
        let rows = vec![
            cells(&["Touch Panel 10in", "TSW-1070", "$1,249.00", "Wall mount"]),
            cells(&["", "", "", ""]),
            cells(&["Control Processor", "CP4N", "call", ""]),
            cells(&["HDMI Extender 100%", "HD-TX", "310", "Transmitter"]),
        ];

        let outcome = db
            .vendor_prices()
            .import(&headers, &rows, &mapping(), &source())
            .await
            .unwrap();

        assert_eq!(outcome.prices.len(), 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.errors[0].row, 4);

        let recent = db.vendor_prices().list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);

        let panel = db.vendor_prices().get(&outcome.prices[0].id).await.unwrap().unwrap();
        assert_eq!(panel.cost, Decimal::new(124900, 2));
        assert_eq!(panel.model.as_deref(), Some("TSW-1070"));
        assert_eq!(panel.vendor, "Crestron");
    }

    #[tokio::test]
    async fn test_search_matches_name_and_description() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let headers = cells(&["Item", "Model", "Cost", "Notes"]);
        let rows = vec![
            cells(&["Touch Panel", "TSW-770", "899", "Tabletop"]),
            cells(&["Ceiling Speaker", "", "120", "Pendant mount"]),
            cells(&["HDMI Extender 100%", "HD-TX", "310", ""]),
        ];
        db.vendor_prices()
            .import(&headers, &rows, &mapping(), &source())
            .await
            .unwrap();

        let by_name = db.vendor_prices().search("panel", 10).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].item_name, "Touch Panel");

        let by_description = db.vendor_prices().search("mount", 10).await.unwrap();
        assert_eq!(by_description[0].item_name, "Ceiling Speaker");

        let literal_percent = db.vendor_prices().search("100%", 10).await.unwrap();
        assert_eq!(literal_percent.len(), 1);

        assert_eq!(db.vendor_prices().search("  ", 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_import_with_unknown_column_stores_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let headers = cells(&["Description", "Price"]);

        let result = db
            .vendor_prices()
            .import(&headers, &[], &mapping(), &source())
            .await;

        assert!(result.is_err());
        assert!(db.vendor_prices().list_recent(10).await.unwrap().is_empty());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }
}
