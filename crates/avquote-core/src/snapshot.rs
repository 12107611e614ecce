//! # Snapshot Payload
//!
//! The serialized form of a quote stored in every [`QuoteVersion`].
//!
//! ## Layout (schema 1)
//! ```text
//! {
//!   "schema_version": 1,
//!   "quote": { id, name, client_name, …, tax_rate, tax_enabled, created_by },
//!   "rooms": [ { room, systems: [ { system, equipment } ], equipment,
//!                labor, services } ]
//! }
//! ```
//!
//! The header deliberately leaves out the quote's `version` counter and its
//! timestamps. Those describe the live row, not its content, so a restored
//! tree captures to the exact same bytes as the version it came from.
//!
//! Encoding is deterministic: fields are written in declaration order and
//! rooms and lines in tree order.
//!
//! Decoding reads `schema_version` first and only then the body, so a payload
//! written by a newer build fails with
//! [`CoreError::UnsupportedSnapshotSchema`] instead of a confusing field error.
//!
//! [`QuoteVersion`]: crate::types::QuoteVersion

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::tree::{QuoteTree, RoomNode};
use crate::types::{Quote, QuoteStatus};

/// Schema written by this build.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Quote header fields that belong to a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub id: String,
    pub name: String,
    pub client_name: String,
    pub department_id: String,
    pub project_address: Option<String>,
    pub description: Option<String>,
    pub status: QuoteStatus,
    pub equipment_markup_default: Decimal,
    pub tax_rate: Decimal,
    pub tax_enabled: bool,
    pub created_by: String,
}

impl From<&Quote> for SnapshotHeader {
    fn from(q: &Quote) -> Self {
        SnapshotHeader {
            id: q.id.clone(),
            name: q.name.clone(),
            client_name: q.client_name.clone(),
            department_id: q.department_id.clone(),
            project_address: q.project_address.clone(),
            description: q.description.clone(),
            status: q.status,
            equipment_markup_default: q.equipment_markup_default,
            tax_rate: q.tax_rate,
            tax_enabled: q.tax_enabled,
            created_by: q.created_by.clone(),
        }
    }
}

/// A point-in-time copy of a quote tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub schema_version: u32,
    pub quote: SnapshotHeader,
    pub rooms: Vec<RoomNode>,
}

#[derive(Deserialize)]
struct SchemaProbe {
    schema_version: Option<u32>,
}

impl QuoteSnapshot {
    /// Captures the content of a tree.
    pub fn capture(tree: &QuoteTree) -> Self {
        QuoteSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            quote: SnapshotHeader::from(&tree.quote),
            rooms: tree.rooms.clone(),
        }
    }

    /// Serializes to the stored JSON payload.
    pub fn encode(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored payload.
    pub fn decode(payload: &str) -> CoreResult<Self> {
        let probe: SchemaProbe = serde_json::from_str(payload)?;
        match probe.schema_version {
            Some(SNAPSHOT_SCHEMA_VERSION) => Ok(serde_json::from_str(payload)?),
            Some(other) => Err(CoreError::UnsupportedSnapshotSchema(other)),
            None => Err(CoreError::UnsupportedSnapshotSchema(0)),
        }
    }

    /// Id of the quote the snapshot was taken from.
    pub fn quote_id(&self) -> &str {
        &self.quote.id
    }

    /// Rebuilds a live tree from this snapshot.
    ///
    /// Identity, version counter and creation time come from `live`; every
    /// other header field and the whole room tree come from the snapshot.
    pub fn apply_to(self, live: &Quote) -> CoreResult<QuoteTree> {
        if self.quote.id != live.id {
            return Err(CoreError::SnapshotQuoteMismatch {
                quote_id: live.id.clone(),
                snapshot_quote_id: self.quote.id,
            });
        }

        let h = self.quote;
        let quote = Quote {
            id: live.id.clone(),
            name: h.name,
            client_name: h.client_name,
            department_id: h.department_id,
            project_address: h.project_address,
            description: h.description,
            status: h.status,
            version: live.version,
            equipment_markup_default: h.equipment_markup_default,
            tax_rate: h.tax_rate,
            tax_enabled: h.tax_enabled,
            created_by: h.created_by,
            created_at: live.created_at,
            updated_at: live.updated_at,
        };
        Ok(QuoteTree::from_parts(quote, self.rooms))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
