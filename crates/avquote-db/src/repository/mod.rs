//! # Repository Module
//!
//! Database repository implementations for AV Quote.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.quotes().mutate(&id, author, |tree| tree.add_room(room))   │
//! │       ▼                                                                 │
//! │  QuoteRepository ──── fetch_tree / write_tree ────┐                    │
//! │       │                                           │                    │
//! │       └── record_version ◄── VersionRepository ───┘ (restore)          │
//! │                                                                         │
//! │  VendorPriceRepository     TemplateRepository                          │
//! │       │                                                                 │
//! │       ▼  SQL                                                            │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`QuoteRepository`](quote::QuoteRepository) - Quote trees, edits, summaries
//! - [`VersionRepository`](version::VersionRepository) - History and restore
//! - [`VendorPriceRepository`](vendor_price::VendorPriceRepository) - Vendor catalog
//! - [`TemplateRepository`](template::TemplateRepository) - Quote templates

pub mod quote;
pub mod template;
pub mod vendor_price;
pub mod version;

mod records;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbResult;

/// Opens a transaction that takes SQLite's writer lock up front.
///
/// A deferred transaction that reads and then writes can fail with
/// `SQLITE_BUSY` once another writer commits. `BEGIN IMMEDIATE` waits on the
/// busy timeout instead, so concurrent edits queue and each reads the
/// latest version number.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}
