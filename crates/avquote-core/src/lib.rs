//! # avquote-core: Quote Pricing, Roll-Up and Versioning
//!
//! Pure business logic of the AV/LV quoting engine. Nothing in this crate
//! touches a database, a file or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AV Quote Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        API / UI / PDF + Excel renderers  (outside this repo)    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ FinancialSummary, BOM (2 dp strings)   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ avquote-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐   │   │
//! │  │   │  pricing  │─►│  rollup   │  │ snapshot  │─►│versioning │   │   │
//! │  │   │ line math │  │ rooms→quote│ │  schema 1 │  │ v1, v2, … │   │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘   │   │
//! │  │   tree · types · money · bom · template · catalog · validation  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                avquote-db (Storage Layer)                       │   │
//! │  │     SQLite, migrations, one transaction per mutation + version  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Quote, Room, System, line items, versions, catalog rows
//! - [`tree`] - Owned quote tree and its editing operations
//! - [`money`] - Decimal helpers and the rounding serializers
//! - [`pricing`] - Pricing Calculator (per line)
//! - [`rollup`] - Roll-Up Aggregator (per room, per quote)
//! - [`snapshot`] - Schema-tagged snapshot payload
//! - [`versioning`] - Version numbering and restore planning
//! - [`bom`] - Bill of materials
//! - [`template`] - Labor/service/tax templates
//! - [`catalog`] - Vendor price list import
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use avquote_core::{summarize, Equipment, NewQuote, Quote, QuoteDefaults, QuoteTree, Room};
//! use rust_decimal::Decimal;
//!
//! let quote = Quote::new(NewQuote::default(), &QuoteDefaults::default(), "user-1");
//! let mut tree = QuoteTree::new(quote);
//! let room_id = tree.add_room(Room::new("", "Boardroom", 2)).unwrap().room.id.clone();
//! tree.add_equipment(Equipment::new(room_id, "DSP", 2, Decimal::from(100))).unwrap();
//!
//! let summary = summarize(&tree).unwrap();
//! assert_eq!(summary.totals.equipment_price, Decimal::from(480));
//! assert_eq!(summary.totals.tax, Decimal::new(384, 1));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bom;
pub mod catalog;
pub mod error;
pub mod money;
pub mod pricing;
pub mod rollup;
pub mod snapshot;
pub mod template;
pub mod tree;
pub mod types;
pub mod validation;
pub mod versioning;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bom::{build_bom, BillOfMaterials};
pub use error::{CoreError, CoreResult, ValidationError};
pub use pricing::{equipment_line_totals, labor_line_totals, service_line_totals, LineTotals};
pub use rollup::{summarize, FinancialSummary, QuoteTotals, RoomSummary};
pub use snapshot::QuoteSnapshot;
pub use template::QuoteTemplate;
pub use tree::{QuoteTree, RoomNode, SystemNode};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest accepted display name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Most identical rooms a single room line may stand for.
///
/// Guards against typing 1000 for 10; larger rollouts are split into rooms.
pub const MAX_ROOM_QUANTITY: i64 = 999;

/// Most units a single equipment line may order.
pub const MAX_LINE_QUANTITY: i64 = 99_999;
