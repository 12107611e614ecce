//! # Version Repository
//!
//! Append-only version history of quotes.
//!
//! ## History Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  quote_versions (quote_id = Q)                                         │
//! │                                                                         │
//! │   v1 create ── v2 add room ── v3 add line ── v4 restore(v1)            │
//! │                                             payload(v4) == payload(v1)  │
//! │                                                                         │
//! │  • Numbers are 1, 2, 3, ... with no gaps                               │
//! │  • Rows are never updated or deleted                                   │
//! │  • Rows outlive the quote they belong to                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use avquote_core::versioning::{prepare_restore, prepare_version};
use avquote_core::{CoreError, QuoteSnapshot, QuoteTree, QuoteVersion, QuoteVersionSummary};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::begin_write;
use super::quote::{fetch_tree, write_tree};
use super::records::{VersionRecord, VersionSummaryRecord};
use crate::error::DbResult;

/// Repository for quote version history.
#[derive(Debug, Clone)]
pub struct VersionRepository {
    pool: SqlitePool,
}

impl VersionRepository {
    /// Creates a new VersionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VersionRepository { pool }
    }

    /// Lists the versions of a quote, oldest first, without payloads.
    pub async fn list(&self, quote_id: &str) -> DbResult<Vec<QuoteVersionSummary>> {
        let records: Vec<VersionSummaryRecord> = sqlx::query_as(
            "SELECT id, quote_id, version, author, created_at \
             FROM quote_versions WHERE quote_id = ?1 ORDER BY version",
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(QuoteVersionSummary::from).collect())
    }

    /// Gets one version with its payload.
    ///
    /// ## Errors
    /// `CoreError::VersionNotFound` if the quote has no such version.
    pub async fn get(&self, quote_id: &str, version: i64) -> DbResult<QuoteVersion> {
        let mut conn = self.pool.acquire().await?;
        fetch_version(&mut conn, quote_id, version).await
    }

    /// Gets one version decoded into its snapshot.
    pub async fn snapshot(&self, quote_id: &str, version: i64) -> DbResult<QuoteSnapshot> {
        let stored = self.get(quote_id, version).await?;
        Ok(QuoteSnapshot::decode(&stored.payload)?)
    }

    /// Number of recorded versions of a quote.
    pub async fn count(&self, quote_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quote_versions WHERE quote_id = ?1")
            .bind(quote_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Restores the live quote to the content of `version` and records the
    /// restore as a new version.
    ///
    /// Earlier versions are left untouched.
    ///
    /// ## Errors
    /// - `NotFound` if the quote itself was deleted
    /// - `CoreError::VersionNotFound` if the version does not exist
    pub async fn restore(&self, quote_id: &str, version: i64, author: &str) -> DbResult<QuoteTree> {
        debug!(quote_id = %quote_id, version, author = %author, "Restoring version");

        let mut tx = begin_write(&self.pool).await?;

        let live = fetch_tree(&mut tx, quote_id).await?;
        let target = fetch_version(&mut tx, quote_id, version).await?;

        let mut restored = prepare_restore(&live, &target)?;
        restored.quote.updated_at = Utc::now();

        write_tree(&mut tx, &restored).await?;
        let recorded = record_version(&mut tx, &mut restored, author).await?;
        tx.commit().await?;

        info!(
            quote_id = %quote_id,
            restored_from = version,
            version = recorded.version,
            "Version restored"
        );
        Ok(restored)
    }
}

/// Loads one version on `conn`.
pub(crate) async fn fetch_version(
    conn: &mut SqliteConnection,
    quote_id: &str,
    version: i64,
) -> DbResult<QuoteVersion> {
    let record: Option<VersionRecord> = sqlx::query_as(
        "SELECT id, quote_id, version, payload, author, created_at \
         FROM quote_versions WHERE quote_id = ?1 AND version = ?2",
    )
    .bind(quote_id)
    .bind(version)
    .fetch_optional(&mut *conn)
    .await?;

    record.map(QuoteVersion::from).ok_or_else(|| {
        CoreError::VersionNotFound {
            quote_id: quote_id.to_string(),
            version,
        }
        .into()
    })
}

/// Snapshots `tree` as the quote's next version and stores the new number
/// on the quote row.
///
/// Must run on the transaction that wrote `tree`.
pub(crate) async fn record_version(
    conn: &mut SqliteConnection,
    tree: &mut QuoteTree,
    author: &str,
) -> DbResult<QuoteVersion> {
    let current_max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM quote_versions WHERE quote_id = ?1")
            .bind(&tree.quote.id)
            .fetch_one(&mut *conn)
            .await?;

    let version = prepare_version(tree, current_max, author, Utc::now())?;

    sqlx::query(
        "INSERT INTO quote_versions (id, quote_id, version, payload, author, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&version.id)
    .bind(&version.quote_id)
    .bind(version.version)
    .bind(&version.payload)
    .bind(&version.author)
    .bind(version.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE quotes SET version = ?2 WHERE id = ?1")
        .bind(&tree.quote.id)
        .bind(version.version)
        .execute(&mut *conn)
        .await?;

    tree.quote.version = version.version;

    debug!(quote_id = %version.quote_id, version = version.version, "Version recorded");
    Ok(version)
}

// =============================================================================
// Unit Tests
// =============================================================================
