//! The history store: a queryable log of analysis records over a [`BlobStore`].
//!
//! [`HistoryStore`] owns an in-memory SQLite table and the only copy of its
//! persisted image. Every mutation runs in a transaction, writes the full table
//! image to the blob store, and commits only if that write succeeded, so the live
//! table never drifts from what a reload would see.
//!
//! Mutations through one store are serialized by an internal mutex. Two stores
//! pointed at the same blob key (e.g. two processes) are not coordinated: the
//! last image written wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;

use super::image::TableImage;
use super::time;
use super::types::{ContextType, HistoryRecord, NewRecord};
use crate::blob::{BlobStore, Scope};
use crate::db;
use crate::error::{ExplainerError, Result};

/// Local-scope key holding the serialized history table.
pub const TABLE_KEY: &str = "history_table";

/// Local-scope key of the session fallback list and of pre-table history.
pub const LEGACY_KEY: &str = "history";

/// Where migrated legacy entries are copied before [`LEGACY_KEY`] is removed.
pub const LEGACY_BACKUP_KEY: &str = "history_backup";

const SELECT_COLUMNS: &str = "SELECT id, text, explanation, timestamp, timestamp_display, \
    prompt_name, source_info, page_url, page_title, context_type, image_data FROM history";

/// The live table and its id counter.
struct Table {
    conn: Connection,
    next_id: i64,
}

pub struct HistoryStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
    table: Mutex<Option<Table>>,
}

impl HistoryStore {
    /// Create a store persisting under [`TABLE_KEY`]. Nothing is loaded until
    /// [`initialize`](Self::initialize) or the first operation.
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_key(blobs, TABLE_KEY)
    }

    pub fn with_key(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
            table: Mutex::new(None),
        }
    }

    /// Load the persisted table, or start an empty one. Idempotent: later calls
    /// reuse the live table without touching the blob store.
    pub fn initialize(&self) -> Result<()> {
        let mut guard = self.lock();
        self.ensure_loaded(&mut guard)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Drop the live table. The next operation reloads it from the blob store.
    pub fn close(&self) {
        if self.lock().take().is_some() {
            tracing::debug!(key = %self.key, "history store closed");
        }
    }

    /// Insert a record and persist the table. Returns the new record's id.
    pub fn add(&self, record: NewRecord) -> Result<i64> {
        let record = prepare(record)?;
        let ids = self.insert_batch(vec![record], || Ok(()))?;
        Ok(ids[0])
    }

    /// All records, most recent first, optionally capped to the `limit` most recent.
    ///
    /// Ties on the timestamp are broken by descending id.
    pub fn list_all(&self, limit: Option<usize>) -> Result<Vec<HistoryRecord>> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        self.with_table(|table| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?1");
            let mut stmt = table.conn.prepare(&sql)?;
            let records = stmt
                .query_map(params![limit], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    /// Records matching `query` and `prompt_filter`, in [`list_all`](Self::list_all) order.
    ///
    /// A non-empty `prompt_filter` keeps only records whose prompt name equals it
    /// exactly. A non-empty `query` keeps records where it occurs, ignoring case,
    /// in any of text, explanation, prompt name, source info, or page title. Empty
    /// arguments do not filter.
    pub fn search(&self, query: &str, prompt_filter: Option<&str>) -> Result<Vec<HistoryRecord>> {
        let filter = prompt_filter.filter(|p| !p.is_empty());
        let needle = (!query.is_empty()).then(|| query.to_lowercase());

        self.with_table(|table| {
            let f = db::CASEFOLD_FN;
            let sql = format!(
                "{SELECT_COLUMNS} \
                 WHERE (?1 IS NULL OR prompt_name = ?1) \
                   AND (?2 IS NULL \
                        OR instr({f}(text), ?2) > 0 \
                        OR instr({f}(explanation), ?2) > 0 \
                        OR instr({f}(coalesce(prompt_name, '')), ?2) > 0 \
                        OR instr({f}(coalesce(source_info, '')), ?2) > 0 \
                        OR instr({f}(coalesce(page_title, '')), ?2) > 0) \
                 ORDER BY timestamp DESC, id DESC"
            );
            let mut stmt = table.conn.prepare(&sql)?;
            let records = stmt
                .query_map(params![filter, needle], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            tracing::debug!(query, prompt_filter = ?filter, matched = records.len(), "history search");
            Ok(records)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<HistoryRecord>> {
        self.with_table(|table| {
            let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
            let record = table
                .conn
                .query_row(&sql, params![id], row_to_record)
                .optional()?;
            Ok(record)
        })
    }

    pub fn count(&self) -> Result<usize> {
        self.with_table(|table| {
            let count: i64 = table
                .conn
                .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Remove a record. Deleting an id that does not exist is a no-op.
    /// Returns whether a record was removed.
    pub fn delete_by_id(&self, id: i64) -> Result<bool> {
        self.with_table(|table| {
            let next_id = table.next_id;
            let tx = table.conn.transaction()?;
            let removed = tx.execute("DELETE FROM history WHERE id = ?1", params![id])?;
            if removed == 0 {
                tracing::debug!(id, "delete of absent history record ignored");
                return Ok(false);
            }
            self.persist(&tx, next_id)?;
            tx.commit()?;
            tracing::info!(id, "history record deleted");
            Ok(true)
        })
    }

    /// Remove every record. Ids are not reused afterwards.
    pub fn clear_all(&self) -> Result<()> {
        self.with_table(|table| {
            let next_id = table.next_id;
            let tx = table.conn.transaction()?;
            let removed = tx.execute("DELETE FROM history", [])?;
            self.persist(&tx, next_id)?;
            tx.commit()?;
            tracing::info!(removed, "history cleared");
            Ok(())
        })
    }

    /// Prompt names in use, sorted, excluding missing and empty names.
    pub fn distinct_prompt_names(&self) -> Result<Vec<String>> {
        self.with_table(|table| {
            let mut stmt = table.conn.prepare(
                "SELECT DISTINCT prompt_name FROM history \
                 WHERE prompt_name IS NOT NULL AND prompt_name != '' ORDER BY prompt_name",
            )?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    /// Import entries left under [`LEGACY_KEY`] by older builds or by the session
    /// fallback. The list is first copied to [`LEGACY_BACKUP_KEY`]; entries are
    /// then inserted oldest first in one transaction that also removes the legacy
    /// key. A failure at any step leaves nothing imported, so the call can be
    /// retried. Returns the number of records imported.
    pub fn migrate_legacy(&self) -> Result<usize> {
        let stored = self
            .blobs
            .get_one(Scope::Local, LEGACY_KEY)
            .map_err(|e| ExplainerError::storage("failed to read legacy history", e))?;

        let items = match stored {
            Some(Value::Array(items)) if !items.is_empty() => items,
            Some(Value::Array(_)) | None => {
                tracing::debug!("no legacy history to migrate");
                return Ok(0);
            }
            Some(other) => {
                return Err(ExplainerError::CorruptState(format!(
                    "legacy history under {LEGACY_KEY:?} is not a list: {other}"
                )));
            }
        };

        tracing::info!(entries = items.len(), "migrating legacy history");

        // Legacy lists are kept most recent first.
        let mut batch = Vec::with_capacity(items.len());
        for item in items.iter().rev() {
            let parsed = serde_json::from_value::<NewRecord>(item.clone())
                .map_err(ExplainerError::from)
                .and_then(prepare);
            match parsed {
                Ok(record) => batch.push(record),
                Err(e) => tracing::warn!(error = %e, "skipping malformed legacy history entry"),
            }
        }

        // Backup first: a failure here leaves nothing imported.
        self.blobs
            .set_one(Scope::Local, LEGACY_BACKUP_KEY, Value::Array(items.clone()))
            .map_err(|e| ExplainerError::storage("failed to back up legacy history", e))?;

        // The legacy key is removed inside the import transaction, so either the
        // rows land and the key is gone or neither happens.
        let imported = batch.len();
        self.insert_batch(batch, || {
            self.blobs
                .remove(Scope::Local, &[LEGACY_KEY])
                .map_err(|e| ExplainerError::storage("failed to remove legacy history", e))
        })
        .map_err(|e| {
            self.restore_legacy(items);
            e
        })?;

        tracing::info!(imported, "legacy history migrated");
        Ok(imported)
    }

    // ── internals ──────────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Option<Table>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the live table, loading it first if needed.
    fn with_table<T>(&self, f: impl FnOnce(&mut Table) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let table = self.ensure_loaded(&mut guard)?;
        f(table)
    }

    fn ensure_loaded<'a>(&self, slot: &'a mut Option<Table>) -> Result<&'a mut Table> {
        let table = match slot.take() {
            Some(table) => table,
            None => self.load()?,
        };
        Ok(slot.insert(table))
    }

    fn load(&self) -> Result<Table> {
        let stored = self
            .blobs
            .get_one(Scope::Local, &self.key)
            .map_err(|e| ExplainerError::storage("failed to load history table", e))?;

        let conn = db::open_table()?;

        let Some(value) = stored else {
            tracing::info!(key = %self.key, "no persisted history table, starting empty");
            return Ok(Table { conn, next_id: 1 });
        };

        match TableImage::decode(value.clone()) {
            Ok(image) => {
                for record in &image.records {
                    insert_row(&conn, record)?;
                }
                tracing::info!(
                    key = %self.key,
                    records = image.records.len(),
                    next_id = image.next_id,
                    "history table loaded"
                );
                Ok(Table {
                    conn,
                    next_id: image.next_id,
                })
            }
            Err(err) => {
                self.quarantine(value);
                tracing::error!(
                    key = %self.key,
                    error = %err,
                    "DATA LOSS: persisted history table is unreadable, starting from an empty table"
                );
                Ok(Table { conn, next_id: 1 })
            }
        }
    }

    /// Best-effort copy of an unreadable image so it can be inspected later.
    fn quarantine(&self, value: Value) {
        let key = format!("{}.corrupt-{}", self.key, time::now_millis());
        match self.blobs.set_one(Scope::Local, &key, value) {
            Ok(()) => tracing::warn!(key = %key, "unreadable history image preserved"),
            Err(e) => tracing::warn!(error = %e, "could not preserve unreadable history image"),
        }
    }

    /// Put the legacy list back after a failed import. Best effort; the backup
    /// key still holds a copy.
    fn restore_legacy(&self, items: Vec<Value>) {
        match self.blobs.get_one(Scope::Local, LEGACY_KEY) {
            Ok(Some(_)) => {}
            _ => {
                if let Err(e) = self.blobs.set_one(Scope::Local, LEGACY_KEY, Value::Array(items)) {
                    tracing::error!(
                        error = %e,
                        backup = LEGACY_BACKUP_KEY,
                        "legacy history could not be restored after a failed import"
                    );
                }
            }
        }
    }

    /// Insert prepared records in one transaction, assigning consecutive ids.
    /// `before_persist` runs after the inserts and before the image is written;
    /// an error from it rolls the inserts back.
    fn insert_batch(
        &self,
        records: Vec<HistoryRecord>,
        before_persist: impl FnOnce() -> Result<()>,
    ) -> Result<Vec<i64>> {
        self.with_table(|table| {
            let mut next_id = table.next_id;
            let mut ids = Vec::with_capacity(records.len());

            let tx = table.conn.transaction()?;
            for mut record in records {
                record.id = next_id;
                insert_row(&tx, &record)?;
                ids.push(next_id);
                tracing::info!(
                    id = next_id,
                    prompt = record.prompt_name.as_deref().unwrap_or(""),
                    context_type = %record.context_type,
                    "history record added"
                );
                next_id += 1;
            }
            before_persist()?;
            self.persist(&tx, next_id)?;
            tx.commit()?;

            table.next_id = next_id;
            Ok(ids)
        })
    }

    /// Write the full table image as seen through `conn` (usually an open transaction).
    fn persist(&self, conn: &Connection, next_id: i64) -> Result<()> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let image = TableImage::new(next_id, records);
        let count = image.records.len();
        let value = serde_json::to_value(&image)?;

        self.blobs
            .set_one(Scope::Local, &self.key, value)
            .map_err(|e| ExplainerError::storage("failed to persist history table", e))?;

        tracing::debug!(key = %self.key, records = count, next_id, "history table persisted");
        Ok(())
    }
}

/// Validate caller input and fill in the derived fields. The id is assigned on insert.
fn prepare(input: NewRecord) -> Result<HistoryRecord> {
    let context_type = input.context_type.unwrap_or_default();
    if input.image_data.is_some() && context_type != ContextType::Image {
        return Err(ExplainerError::Validation(format!(
            "image data supplied for a {context_type} record"
        )));
    }

    let (created_at_epoch_millis, created_at_display) = match input.timestamp {
        Some(shown) => match time::parse_display(&shown) {
            Some(millis) => (millis, shown),
            None => {
                tracing::warn!(display = %shown, "unparseable display timestamp, using current time");
                (time::now_millis(), shown)
            }
        },
        None => (time::now_millis(), time::now_display()),
    };

    Ok(HistoryRecord {
        id: 0,
        text: input.text,
        explanation: input.explanation,
        created_at_epoch_millis,
        created_at_display,
        prompt_name: input.prompt_name,
        source_info: input.source_info,
        page_url: input.page_url,
        page_title: input.page_title,
        context_type,
        image_data: input.image_data,
    })
}

fn insert_row(conn: &Connection, record: &HistoryRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO history (id, text, explanation, timestamp, timestamp_display, \
         prompt_name, source_info, page_url, page_title, context_type, image_data) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.id,
            record.text,
            record.explanation,
            record.created_at_epoch_millis,
            record.created_at_display,
            record.prompt_name,
            record.source_info,
            record.page_url,
            record.page_title,
            record.context_type.as_str(),
            record.image_data,
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let context_type: String = row.get(9)?;
    Ok(HistoryRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        explanation: row.get(2)?,
        created_at_epoch_millis: row.get(3)?,
        created_at_display: row.get(4)?,
        prompt_name: row.get(5)?,
        source_info: row.get(6)?,
        page_url: row.get(7)?,
        page_title: row.get(8)?,
        context_type: context_type.parse().unwrap_or_default(),
        image_data: row.get(10)?,
    })
}
