//! # Version Snapshot Manager
//!
//! Planning side of quote versioning. These functions decide version numbers
//! and build the records to persist; the storage layer runs them inside the
//! same transaction as the mutation they record.
//!
//! ## Version Lifecycle
//! ```text
//!   create ─────────────► v1
//!   save (any mutation) ─► v(n+1)
//!   restore(target) ─────► v(n+1)   content == content of v(target)
//!
//!   History is append-only. No version is ever rewritten or removed, and a
//!   restore is itself a new version.
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::snapshot::QuoteSnapshot;
use crate::tree::QuoteTree;
use crate::types::{new_id, QuoteVersion};

/// Number for the next version given the highest recorded one.
#[inline]
pub fn next_version(current_max: Option<i64>) -> i64 {
    current_max.map_or(1, |max| max + 1)
}

/// Builds the version record for the current state of `tree`.
///
/// `current_max` must be read in the same transaction that will insert the
/// returned record.
pub fn prepare_version(
    tree: &QuoteTree,
    current_max: Option<i64>,
    author: &str,
    now: DateTime<Utc>,
) -> CoreResult<QuoteVersion> {
    let payload = QuoteSnapshot::capture(tree).encode()?;
    Ok(QuoteVersion {
        id: new_id(),
        quote_id: tree.quote.id.clone(),
        version: next_version(current_max),
        payload,
        author: author.to_string(),
        created_at: now,
    })
}

/// Builds the live tree that restoring `target` produces.
///
/// The caller persists the result and then records it with
/// [`prepare_version`].
pub fn prepare_restore(live: &QuoteTree, target: &QuoteVersion) -> CoreResult<QuoteTree> {
    if target.quote_id != live.quote.id {
        return Err(CoreError::SnapshotQuoteMismatch {
            quote_id: live.quote.id.clone(),
            snapshot_quote_id: target.quote_id.clone(),
        });
    }
    QuoteSnapshot::decode(&target.payload)?.apply_to(&live.quote)
}

// =============================================================================
// Unit Tests
// =============================================================================
