//! # Vendor Catalog Import
//!
//! Turns spreadsheet rows into [`VendorPrice`] entries. Reading the file is
//! someone else's job: this module receives the header row and the data rows
//! as already-extracted cell strings.
//!
//! ## Import Flow
//! ```text
//!   header row ──► ColumnMapping::resolve ──► column indexes
//!                                                  │
//!   data rows ─────────────────────────────────────▼
//!     row 2  name + price present ──► parse ──► VendorPrice
//!     row 3  name or price blank  ──► skipped
//!     row 4  price "TBD"          ──► RowError { row: 4, … }
//!
//!   Only the first MAX_REPORTED_ERRORS errors are kept, but every error is
//!   counted.
//! ```
//!
//! Row numbers are spreadsheet row numbers: the header is row 1, the first
//! data row is row 2.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{new_id, VendorPrice};
use crate::validation::{parse_money, validate_name, ValidationResult};

/// How many row errors an import reports.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Which header holds which field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ColumnMapping {
    pub item_name: String,
    pub price: String,
    pub description: Option<String>,
    pub model: Option<String>,
}

/// Catalog attributes shared by every row of one import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSource {
    pub vendor: String,
    pub department_id: Option<String>,
    pub all_departments: bool,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedColumns {
    item_name: usize,
    price: usize,
    description: Option<usize>,
    model: Option<usize>,
}

fn find_column(headers: &[Option<String>], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.as_deref().map(str::trim) == Some(name.trim()))
}

impl ColumnMapping {
    fn resolve(&self, headers: &[Option<String>]) -> ValidationResult<ResolvedColumns> {
        let required = |field: &str, name: &str| {
            find_column(headers, name).ok_or_else(|| ValidationError::NotAllowed {
                field: field.to_string(),
                allowed: headers.iter().flatten().cloned().collect(),
            })
        };

        Ok(ResolvedColumns {
            item_name: required("item_name", &self.item_name)?,
            price: required("price", &self.price)?,
            description: self
                .description
                .as_deref()
                .and_then(|name| find_column(headers, name)),
            model: self.model.as_deref().and_then(|name| find_column(headers, name)),
        })
    }
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RowError {
    /// 1-based spreadsheet row.
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

/// Result of parsing a sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportOutcome {
    pub prices: Vec<VendorPrice>,
    /// Rows without an item name or a price.
    pub skipped: usize,
    /// The first [`MAX_REPORTED_ERRORS`] errors.
    pub errors: Vec<RowError>,
    /// All errors, including the ones not kept in `errors`.
    pub error_count: usize,
}

fn cell(row: &[Option<String>], idx: usize) -> Option<&str> {
    row.get(idx)
        .and_then(|c| c.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parses data rows into catalog entries.
///
/// Fails only when the mapping names a required column that is not in the
/// header row. Problems with individual rows are collected in the outcome.
pub fn import_rows(
    headers: &[Option<String>],
    rows: &[Vec<Option<String>>],
    mapping: &ColumnMapping,
    source: &ImportSource,
    imported_at: DateTime<Utc>,
) -> ValidationResult<ImportOutcome> {
    let vendor = validate_name("vendor", &source.vendor)?;
    let cols = mapping.resolve(headers)?;
    let mut outcome = ImportOutcome::default();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 2;

        let (Some(item_name), Some(raw_price)) = (cell(row, cols.item_name), cell(row, cols.price))
        else {
            outcome.skipped += 1;
            continue;
        };

        let parsed = validate_name("item_name", item_name)
            .and_then(|name| Ok((name, parse_money("price", raw_price)?)));

        match parsed {
            Ok((item_name, cost)) => outcome.prices.push(VendorPrice {
                id: new_id(),
                item_name,
                model: cols.model.and_then(|i| cell(row, i)).map(str::to_string),
                cost,
                description: cols.description.and_then(|i| cell(row, i)).map(str::to_string),
                vendor: vendor.clone(),
                department_id: source.department_id.clone(),
                all_departments: source.all_departments,
                imported_at,
            }),
            Err(err) => {
                outcome.error_count += 1;
                if outcome.errors.len() < MAX_REPORTED_ERRORS {
                    outcome.errors.push(RowError {
                        row: row_number,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    Ok(outcome)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            item_name: "Product".to_string(),
            price: "Dealer Cost".to_string(),
            description: Some("Notes".to_string()),
            model: None,
        }
    }

    fn source() -> ImportSource {
        ImportSource {
            vendor: "Extron".to_string(),
            department_id: Some("dept-av".to_string()),
            all_departments: false,
        }
    }

    #[test]
    fn test_imports_mapped_columns() {
        let headers = cells(&["SKU", "Product", "Dealer Cost", "Notes"]);
        let rows = vec![
            cells(&["60-1", "Switcher", "$1,250.00", "4K"]),
            cells(&["60-2", "Scaler", "899", ""]),
        ];

        let outcome = import_rows(&headers, &rows, &mapping(), &source(), Utc::now()).unwrap();

        assert_eq!(outcome.prices.len(), 2);
        assert_eq!(outcome.prices[0].item_name, "Switcher");
        assert_eq!(outcome.prices[0].cost, Decimal::new(125000, 2));
        assert_eq!(outcome.prices[0].description.as_deref(), Some("4K"));
        assert_eq!(outcome.prices[1].description, None);
        assert_eq!(outcome.prices[1].vendor, "Extron");
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let headers = cells(&["Product", "Dealer Cost"]);
        let rows = vec![cells(&["", "10"]), cells(&["Cable", ""]), vec![]];

        let outcome = import_rows(&headers, &rows, &mapping(), &source(), Utc::now()).unwrap();
        assert!(outcome.prices.is_empty());
        assert_eq!(outcome.skipped, 3);
    }

    #[test]
    fn test_bad_rows_report_spreadsheet_row_numbers() {
        let headers = cells(&["Product", "Dealer Cost"]);
        let rows = vec![cells(&["Cable", "2.50"]), cells(&["Mount", "TBD"])];

        let outcome = import_rows(&headers, &rows, &mapping(), &source(), Utc::now()).unwrap();
        assert_eq!(outcome.prices.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 3);
        assert!(outcome.errors[0].to_string().starts_with("Row 3: price"));
    }

    #[test]
    fn test_error_list_is_capped() {
        let headers = cells(&["Product", "Dealer Cost"]);
        let rows: Vec<_> = (0..25).map(|_| cells(&["Item", "n/a"])).collect();

        let outcome = import_rows(&headers, &rows, &mapping(), &source(), Utc::now()).unwrap();
        assert_eq!(outcome.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(outcome.error_count, 25);
        assert_eq!(outcome.errors[9].row, 11);
    }

    #[test]
    fn test_missing_required_column() {
        let headers = cells(&["Product", "MSRP"]);
        let err = import_rows(&headers, &[], &mapping(), &source(), Utc::now()).unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_vendor_is_required() {
        let headers = cells(&["Product", "Dealer Cost"]);
        let source = ImportSource {
            vendor: " ".to_string(),
            ..source()
        };
        assert!(import_rows(&headers, &[], &mapping(), &source, Utc::now()).is_err());
    }
}
