//! # avquote-db: Storage Layer for AV Quote
//!
//! SQLite storage for quote trees, their version history, the vendor price
//! catalog and quote templates. All pricing and snapshot logic lives in
//! `avquote-core`; this crate loads trees, persists them and draws the
//! transaction boundary around "edit + record version".
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AV Quote Data Flow                               │
//! │                                                                         │
//! │  API handler (outside this workspace)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   avquote-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │◄───│ QuoteRepo      │    │ 0001_tree    │  │   │
//! │  │   │ SqlitePool    │    │ VersionRepo    │    │ 0002_catalog │  │   │
//! │  │   │               │    │ VendorPrice    │    │              │  │   │
//! │  │   │               │    │ TemplateRepo   │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                               │                                 │   │
//! │  │                               ▼                                 │   │
//! │  │                avquote-core (tree edits, roll-up, snapshots)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (AVQUOTE_DATABASE_PATH)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use avquote_db::{Database, StoreConfig};
//!
//! let config = StoreConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let tree = db.quotes().create(new_quote, "ana").await?;
//! let tree = db.quotes().mutate(&tree.quote.id, "ana", |t| {
//!     t.add_room(Room::new("", "Boardroom", 2))?;
//!     Ok(())
//! }).await?;
//! let summary = db.quotes().summary(&tree.quote.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, StoreConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::quote::QuoteRepository;
pub use repository::template::TemplateRepository;
pub use repository::vendor_price::VendorPriceRepository;
pub use repository::version::VersionRepository;
