//! # Quote Repository
//!
//! Loads and persists quote trees. Every change goes through
//! [`QuoteRepository::mutate`], which records a version in the same
//! transaction.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One Edit = One Transaction                        │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                                                       │
//! │   ├── fetch_tree(quote_id)            quotes + rooms + lines           │
//! │   ├── edit(&mut tree)                 pure avquote-core operation      │
//! │   │      └── Err ─► ROLLBACK, nothing written                          │
//! │   ├── write_tree(tree)                header UPDATE, rooms replaced    │
//! │   ├── record_version(tree, author)    MAX(version) + 1, INSERT         │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Live tree and latest version never disagree.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edits take SQLite's writer lock when their transaction begins, so two
//! concurrent edits of the same quote run one after the other. The second
//! waits on the busy timeout, then reads the tree and version number the
//! first committed. The later edit wins. `UNIQUE(quote_id, version)` backs
//! this up at the schema level.

use std::collections::HashMap;

use avquote_core::validation::validate_name;
use avquote_core::{
    build_bom, summarize, BillOfMaterials, CoreResult, Equipment, FinancialSummary, NewQuote,
    Quote, QuoteDefaults, QuoteStatus, QuoteTree, QuoteUpdate, RoomNode, SystemNode,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::begin_write;
use super::records::{
    pricing_columns, EquipmentRecord, LaborRecord, QuoteRecord, RoomRecord, ServiceRecord,
    SystemRecord,
};
use super::template::TemplateRepository;
use super::version::record_version;
use crate::error::{DbError, DbResult};

/// Repository for quotes and their room trees.
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
    defaults: QuoteDefaults,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository.
    pub fn new(pool: SqlitePool, defaults: QuoteDefaults) -> Self {
        QuoteRepository { pool, defaults }
    }

    /// Creates an empty quote and records it as version 1.
    ///
    /// Pricing fields left unset in `input` come from the repository's
    /// [`QuoteDefaults`].
    pub async fn create(&self, mut input: NewQuote, author: &str) -> DbResult<QuoteTree> {
        input.name = validate_name("name", &input.name)?;

        let mut tree = QuoteTree::new(Quote::new(input, &self.defaults, author));

        debug!(quote_id = %tree.quote.id, name = %tree.quote.name, "Creating quote");

        let mut tx = begin_write(&self.pool).await?;
        insert_quote(&mut tx, &tree.quote).await?;
        record_version(&mut tx, &mut tree, author).await?;
        tx.commit().await?;

        info!(quote_id = %tree.quote.id, "Quote created");
        Ok(tree)
    }

    /// Gets a quote header by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Quote>> {
        let sql = format!("SELECT {} FROM quotes WHERE id = ?1", QuoteRecord::COLUMNS);

        let record: Option<QuoteRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        record.map(Quote::try_from).transpose()
    }

    /// Loads the full live tree of a quote.
    pub async fn load_tree(&self, id: &str) -> DbResult<QuoteTree> {
        let mut conn = self.pool.acquire().await?;
        fetch_tree(&mut conn, id).await
    }

    /// Lists quote headers, most recently updated first.
    ///
    /// `department_id` restricts the list to one department.
    pub async fn list(&self, department_id: Option<&str>) -> DbResult<Vec<Quote>> {
        let sql = format!(
            "SELECT {} FROM quotes \
             WHERE (?1 IS NULL OR department_id = ?1) \
             ORDER BY updated_at DESC, name",
            QuoteRecord::COLUMNS
        );

        let records: Vec<QuoteRecord> = sqlx::query_as(&sql)
            .bind(department_id)
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(Quote::try_from).collect()
    }

    /// Applies `edit` to the live tree and records the result as a new
    /// version, atomically.
    ///
    /// ## Returns
    /// The tree as persisted, with its new version number.
    ///
    /// ## Errors
    /// - `NotFound` if the quote does not exist
    /// - Whatever `edit` returns; nothing is written in that case
    ///
    /// ## Example
    /// ```rust,ignore
    /// let tree = db.quotes().mutate(&quote_id, "ana", |tree| {
    ///     tree.add_room(Room::new("", "Huddle", 3))?;
    ///     Ok(())
    /// }).await?;
    /// ```
    pub async fn mutate<F>(&self, id: &str, author: &str, edit: F) -> DbResult<QuoteTree>
    where
        F: FnOnce(&mut QuoteTree) -> CoreResult<()>,
    {
        let mut tx = begin_write(&self.pool).await?;

        let mut tree = fetch_tree(&mut tx, id).await?;
        edit(&mut tree)?;
        tree.quote.updated_at = Utc::now();

        write_tree(&mut tx, &tree).await?;
        let version = record_version(&mut tx, &mut tree, author).await?;
        tx.commit().await?;

        debug!(quote_id = %id, version = version.version, author = %author, "Quote updated");
        Ok(tree)
    }

    /// Patches header fields.
    pub async fn update(&self, id: &str, mut update: QuoteUpdate, author: &str) -> DbResult<QuoteTree> {
        if let Some(name) = update.name.as_deref() {
            update.name = Some(validate_name("name", name)?);
        }

        self.mutate(id, author, |tree| {
            tree.update_quote(update);
            Ok(())
        })
        .await
    }

    /// Sets the quote's status. Any status may follow any other.
    pub async fn set_status(&self, id: &str, status: QuoteStatus, author: &str) -> DbResult<QuoteTree> {
        self.mutate(id, author, |tree| {
            tree.set_status(status);
            Ok(())
        })
        .await
    }

    /// Applies a stored template to one room of the quote.
    pub async fn apply_template(
        &self,
        id: &str,
        room_id: &str,
        template_id: &str,
        author: &str,
    ) -> DbResult<QuoteTree> {
        let template = TemplateRepository::new(self.pool.clone())
            .get(template_id)
            .await?
            .ok_or_else(|| DbError::not_found("Template", template_id))?;

        self.mutate(id, author, |tree| tree.apply_template(room_id, &template))
            .await
    }

    /// Computes the financial summary of the live tree.
    pub async fn summary(&self, id: &str) -> DbResult<FinancialSummary> {
        Ok(summarize(&self.load_tree(id).await?)?)
    }

    /// Builds the bill of materials of the live tree.
    pub async fn bom(&self, id: &str) -> DbResult<BillOfMaterials> {
        Ok(build_bom(&self.load_tree(id).await?)?)
    }

    /// Deletes a quote and its tree. Its version history is kept.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(quote_id = %id, "Deleting quote");

        let result = sqlx::query("DELETE FROM quotes WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Quote", id));
        }

        info!(quote_id = %id, "Quote deleted");
        Ok(())
    }
}

// =============================================================================
// Tree I/O (shared with the version repository)
// =============================================================================

/// Loads a quote and its whole tree on `conn`.
pub(crate) async fn fetch_tree(conn: &mut SqliteConnection, quote_id: &str) -> DbResult<QuoteTree> {
    let sql = format!("SELECT {} FROM quotes WHERE id = ?1", QuoteRecord::COLUMNS);
    let quote: Quote = sqlx::query_as::<_, QuoteRecord>(&sql)
        .bind(quote_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Quote", quote_id))?
        .try_into()?;

    let rooms: Vec<RoomRecord> = sqlx::query_as(
        "SELECT id, quote_id, name, quantity FROM rooms WHERE quote_id = ?1 ORDER BY position",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    let systems: Vec<SystemRecord> = sqlx::query_as(
        "SELECT s.id, s.room_id, s.name, s.description \
         FROM systems s JOIN rooms r ON r.id = s.room_id \
         WHERE r.quote_id = ?1 ORDER BY s.position",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    let equipment: Vec<EquipmentRecord> = sqlx::query_as(
        "SELECT e.id, e.room_id, e.system_id, e.item_name, e.model, e.vendor, e.description, \
                e.quantity, e.unit_cost, e.markup_override, e.tax_exempt \
         FROM equipment e JOIN rooms r ON r.id = e.room_id \
         WHERE r.quote_id = ?1 ORDER BY e.position",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    let labor: Vec<LaborRecord> = sqlx::query_as(
        "SELECT l.id, l.room_id, l.role_name, l.cost_rate, l.sell_rate, l.hours, l.department_id \
         FROM labor l JOIN rooms r ON r.id = l.room_id \
         WHERE r.quote_id = ?1 ORDER BY l.position",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    let services: Vec<ServiceRecord> = sqlx::query_as(
        "SELECT s.id, s.room_id, s.service_name, s.pricing_kind, s.pricing_value, s.cost, \
                s.department_id, s.description \
         FROM services s JOIN rooms r ON r.id = s.room_id \
         WHERE r.quote_id = ?1 ORDER BY s.position",
    )
    .bind(quote_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut nodes: Vec<RoomNode> = rooms.into_iter().map(|r| RoomNode::new(r.into())).collect();
    let room_index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.room.id.clone(), i))
        .collect();

    // (room index, system index) per system id
    let mut system_index: HashMap<String, (usize, usize)> = HashMap::new();
    for record in systems {
        if let Some(&ri) = room_index.get(&record.room_id) {
            let node = &mut nodes[ri];
            system_index.insert(record.id.clone(), (ri, node.systems.len()));
            node.systems.push(SystemNode::new(record.into()));
        }
    }

    for record in equipment {
        let line = Equipment::try_from(record)?;
        match line.system_id.as_deref().and_then(|sid| system_index.get(sid)) {
            Some(&(ri, si)) => nodes[ri].systems[si].equipment.push(line),
            None => {
                if let Some(&ri) = room_index.get(&line.room_id) {
                    nodes[ri].equipment.push(line);
                }
            }
        }
    }

    for record in labor {
        if let Some(&ri) = room_index.get(&record.room_id) {
            nodes[ri].labor.push(record.try_into()?);
        }
    }

    for record in services {
        if let Some(&ri) = room_index.get(&record.room_id) {
            nodes[ri].services.push(record.try_into()?);
        }
    }

    Ok(QuoteTree::from_parts(quote, nodes))
}

/// Inserts a new quote header row.
pub(crate) async fn insert_quote(conn: &mut SqliteConnection, quote: &Quote) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO quotes (
            id, name, client_name, department_id, project_address, description,
            status, version, equipment_markup_default, tax_rate, tax_enabled,
            created_by, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&quote.id)
    .bind(&quote.name)
    .bind(&quote.client_name)
    .bind(&quote.department_id)
    .bind(&quote.project_address)
    .bind(&quote.description)
    .bind(quote.status)
    .bind(quote.version)
    .bind(quote.equipment_markup_default.to_string())
    .bind(quote.tax_rate.to_string())
    .bind(quote.tax_enabled)
    .bind(&quote.created_by)
    .bind(quote.created_at)
    .bind(quote.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Overwrites the live header and tree of an existing quote with `tree`.
///
/// Rooms are deleted (cascading to systems and lines) and re-inserted in
/// tree order.
pub(crate) async fn write_tree(conn: &mut SqliteConnection, tree: &QuoteTree) -> DbResult<()> {
    let quote = &tree.quote;

    let result = sqlx::query(
        r#"
        UPDATE quotes SET
            name = ?2, client_name = ?3, department_id = ?4, project_address = ?5,
            description = ?6, status = ?7, equipment_markup_default = ?8, tax_rate = ?9,
            tax_enabled = ?10, created_by = ?11, updated_at = ?12
        WHERE id = ?1
        "#,
    )
    .bind(&quote.id)
    .bind(&quote.name)
    .bind(&quote.client_name)
    .bind(&quote.department_id)
    .bind(&quote.project_address)
    .bind(&quote.description)
    .bind(quote.status)
    .bind(quote.equipment_markup_default.to_string())
    .bind(quote.tax_rate.to_string())
    .bind(quote.tax_enabled)
    .bind(&quote.created_by)
    .bind(quote.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Quote", &quote.id));
    }

    sqlx::query("DELETE FROM rooms WHERE quote_id = ?1")
        .bind(&quote.id)
        .execute(&mut *conn)
        .await?;

    for (position, node) in tree.rooms.iter().enumerate() {
        insert_room(conn, node, position as i64).await?;
    }

    Ok(())
}

async fn insert_room(conn: &mut SqliteConnection, node: &RoomNode, position: i64) -> DbResult<()> {
    let room = &node.room;

    sqlx::query("INSERT INTO rooms (id, quote_id, name, quantity, position) VALUES (?1, ?2, ?3, ?4, ?5)")
        .bind(&room.id)
        .bind(&room.quote_id)
        .bind(&room.name)
        .bind(room.quantity)
        .bind(position)
        .execute(&mut *conn)
        .await?;

    for (i, system) in node.systems.iter().enumerate() {
        sqlx::query(
            "INSERT INTO systems (id, room_id, name, description, position) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&system.system.id)
        .bind(&system.system.room_id)
        .bind(&system.system.name)
        .bind(&system.system.description)
        .bind(i as i64)
        .execute(&mut *conn)
        .await?;
    }

    // System lines first, then loose lines, matching RoomNode::all_equipment.
    for (i, line) in node.all_equipment().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO equipment (
                id, room_id, system_id, item_name, model, vendor, description,
                quantity, unit_cost, markup_override, tax_exempt, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&line.id)
        .bind(&line.room_id)
        .bind(&line.system_id)
        .bind(&line.item_name)
        .bind(&line.model)
        .bind(&line.vendor)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_cost.to_string())
        .bind(line.markup_override.map(|m| m.to_string()))
        .bind(line.tax_exempt)
        .bind(i as i64)
        .execute(&mut *conn)
        .await?;
    }

    for (i, line) in node.labor.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO labor (
                id, room_id, role_name, cost_rate, sell_rate, hours, department_id, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&line.id)
        .bind(&line.room_id)
        .bind(&line.role_name)
        .bind(line.cost_rate.to_string())
        .bind(line.sell_rate.to_string())
        .bind(line.hours.to_string())
        .bind(&line.department_id)
        .bind(i as i64)
        .execute(&mut *conn)
        .await?;
    }

    for (i, line) in node.services.iter().enumerate() {
        let (kind, value) = pricing_columns(&line.pricing);
        sqlx::query(
            r#"
            INSERT INTO services (
                id, room_id, service_name, pricing_kind, pricing_value, cost,
                department_id, description, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.room_id)
        .bind(&line.service_name)
        .bind(kind)
        .bind(value)
        .bind(line.cost.map(|c| c.to_string()))
        .bind(&line.department_id)
        .bind(&line.description)
        .bind(i as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use avquote_core::{Labor, Room, Service, System};
    use rust_decimal::Decimal;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_quote(name: &str) -> NewQuote {
        NewQuote {
            name: name.to_string(),
            client_name: "Acme Corp".to_string(),
            department_id: "dept-av".to_string(),
            ..NewQuote::default()
        }
    }

    #[tokio::test]
    async fn test_create_records_version_one() {
        let db = setup().await;

        let tree = db.quotes().create(new_quote("HQ Refresh"), "ana").await.unwrap();

        assert_eq!(tree.quote.version, 1);
        assert_eq!(tree.quote.equipment_markup_default, Decimal::from(20));

        let stored = db.quotes().get(&tree.quote.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.status, QuoteStatus::Draft);
        assert_eq!(db.versions().count(&tree.quote.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = setup().await;

        let err = db.quotes().create(new_quote("  "), "ana").await.unwrap_err();

        assert!(matches!(err, DbError::Core(_)));
        assert!(db.quotes().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tree_round_trips_through_storage() {
        let db = setup().await;
        let quote_id = db.quotes().create(new_quote("HQ"), "ana").await.unwrap().quote.id;

        let edited = db
            .quotes()
            .mutate(&quote_id, "ana", |tree| {
                let room_id = tree.add_room(Room::new("", "Boardroom", 2))?.room.id.clone();
                let system = System::new(&room_id, "Video Conferencing");
                let system_id = system.id.clone();
                tree.add_system(system)?;
                tree.add_equipment(
                    Equipment::new(&room_id, "Codec", 1, Decimal::new(450000, 2)).in_system(&system_id),
                )?;
                tree.add_equipment(
                    Equipment::new(&room_id, "Cable kit", 4, Decimal::new(1250, 2))
                        .with_markup_override(Decimal::from(50))
                        .tax_exempt(),
                )?;
                tree.add_labor(Labor::new(
                    &room_id,
                    "Installer",
                    Decimal::from(45),
                    Decimal::from(95),
                    Decimal::new(75, 1),
                ))?;
                tree.add_service(Service::percent_of_equipment(&room_id, "Programming", Decimal::from(5)))?;
                Ok(())
            })
            .await
            .unwrap();

        let loaded = db.quotes().load_tree(&quote_id).await.unwrap();

        assert_eq!(loaded.rooms, edited.rooms);
        assert_eq!(loaded.quote.version, 2);
        assert_eq!(loaded.rooms[0].systems[0].equipment[0].item_name, "Codec");
        assert_eq!(loaded.rooms[0].equipment[0].unit_cost.to_string(), "12.50");
    }

    #[tokio::test]
    async fn test_failed_edit_writes_nothing() {
        let db = setup().await;
        let quote_id = db.quotes().create(new_quote("HQ"), "ana").await.unwrap().quote.id;

        let err = db
            .quotes()
            .mutate(&quote_id, "ana", |tree| {
                tree.add_room(Room::new("", "Lobby", 1))?;
                tree.remove_room("missing-room")?;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        let tree = db.quotes().load_tree(&quote_id).await.unwrap();
        assert!(tree.rooms.is_empty());
        assert_eq!(tree.quote.version, 1);
        assert_eq!(db.versions().count(&quote_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_status_are_versioned() {
        let db = setup().await;
        let quote_id = db.quotes().create(new_quote("HQ"), "ana").await.unwrap().quote.id;

        db.quotes()
            .update(
                &quote_id,
                QuoteUpdate {
                    name: Some(" HQ Phase 2 ".to_string()),
                    tax_enabled: Some(false),
                    ..QuoteUpdate::default()
                },
                "ben",
            )
            .await
            .unwrap();
        let tree = db
            .quotes()
            .set_status(&quote_id, QuoteStatus::Approved, "ben")
            .await
            .unwrap();

        assert_eq!(tree.quote.name, "HQ Phase 2");
        assert!(!tree.quote.tax_enabled);
        assert_eq!(tree.quote.status, QuoteStatus::Approved);
        assert_eq!(tree.quote.version, 3);
    }

    #[tokio::test]
    async fn test_update_clears_optional_header_fields() {
        let db = setup().await;
        let mut input = new_quote("HQ");
        input.project_address = Some("1 Harbor Way".to_string());
        input.description = Some("Phase 1".to_string());
        let quote_id = db.quotes().create(input, "ana").await.unwrap().quote.id;

        db.quotes()
            .update(
                &quote_id,
                QuoteUpdate {
                    project_address: Some(None),
                    ..QuoteUpdate::default()
                },
                "ben",
            )
            .await
            .unwrap();

        let quote = db.quotes().get(&quote_id).await.unwrap().unwrap();
        assert_eq!(quote.project_address, None);
        assert_eq!(quote.description.as_deref(), Some("Phase 1"));
        assert_eq!(quote.version, 2);
    }

    #[tokio::test]
    async fn test_summary_of_stored_quote() {
        let db = setup().await;
        let quote_id = db.quotes().create(new_quote("HQ"), "ana").await.unwrap().quote.id;

        db.quotes()
            .mutate(&quote_id, "ana", |tree| {
                let room_id = tree.add_room(Room::new("", "Huddle", 2))?.room.id.clone();
                tree.add_equipment(Equipment::new(&room_id, "Display", 2, Decimal::from(100)))?;
                Ok(())
            })
            .await
            .unwrap();

        let summary = db.quotes().summary(&quote_id).await.unwrap();

        assert_eq!(summary.totals.equipment_cost, Decimal::from(400));
        assert_eq!(summary.totals.equipment_price, Decimal::from(480));
        assert_eq!(summary.totals.tax, Decimal::new(3840, 2));

        let bom = db.quotes().bom(&quote_id).await.unwrap();
        assert_eq!(bom.items[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = setup().await;
        let first = db.quotes().create(new_quote("First"), "ana").await.unwrap().quote.id;
        db.quotes()
            .create(
                NewQuote {
                    department_id: "dept-lv".to_string(),
                    ..new_quote("Second")
                },
                "ana",
            )
            .await
            .unwrap();

        assert_eq!(db.quotes().list(None).await.unwrap().len(), 2);
        assert_eq!(db.quotes().list(Some("dept-av")).await.unwrap().len(), 1);

        db.quotes().delete(&first).await.unwrap();

        assert!(db.quotes().get(&first).await.unwrap().is_none());
        assert!(db.quotes().load_tree(&first).await.unwrap_err().is_not_found());
        assert!(db.quotes().delete(&first).await.unwrap_err().is_not_found());
    }
}
