//! Profile Pool Storage Layer
//!
//! Implements the EntryStore trait on SQLite.
//!
//! # Architecture
//!
//! - One `profile_entries` table; `meta` is stored as JSON text
//! - Every trait method is a single SQL statement (or one transaction for
//!   bulk insert), so each is atomic on its own
//! - Meta filters go through `json_each`, with keys and values bound as
//!   parameters
//!
//! # Examples
//!
//! ```no_run
//! use profilepool_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for entry operations
//! ```

#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use profilepool_domain::{
    EntryFilter, EntryId, EntryStore, EntryUpdate, Meta, NewEntry, ProfileEntry,
};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Meta document could not be encoded or decoded
    #[error("Invalid meta document: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A thread panicked while holding the connection
    #[error("Store connection poisoned")]
    Poisoned,
}

const COLUMNS: &str = "id, name, locked, locked_dt, error_cnt, use_cnt, meta, disabled";

/// SQLite-based implementation of EntryStore
///
/// # Thread Safety
///
/// The connection sits behind a mutex, so one store can be shared across
/// request handlers and the sweeper. Statements run one at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a store backed by a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn timestamp_to_millis(at: DateTime<Utc>) -> i64 {
        at.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> Result<DateTime<Utc>, StoreError> {
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| StoreError::InvalidData(format!("Timestamp out of range: {}", millis)))
    }

    /// Map a row selected with [`COLUMNS`] to an entry
    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<ProfileEntry> {
        let id: String = row.get(0)?;
        let id = id.parse::<EntryId>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let locked_at = row
            .get::<_, Option<i64>>(3)?
            .map(Self::millis_to_timestamp)
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(e))
            })?;

        let meta: String = row.get(6)?;
        let meta: Meta = serde_json::from_str(&meta).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ProfileEntry {
            id,
            name: row.get(1)?,
            locked: row.get(2)?,
            locked_at,
            error_count: row.get::<_, i64>(4)? as u64,
            use_count: row.get::<_, i64>(5)? as u64,
            meta,
            disabled: row.get(7)?,
        })
    }

    /// Build a `WHERE` condition for the filter
    fn where_clause(filter: &EntryFilter) -> (String, Vec<Box<dyn ToSql>>) {
        let mut sql = String::from("1=1");
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(id) = filter.id {
            sql.push_str(" AND id = ?");
            params.push(Box::new(id.to_string()));
        }

        if let Some(name) = &filter.name {
            sql.push_str(" AND name = ?");
            params.push(Box::new(name.clone()));
        }

        if let Some(locked) = filter.locked {
            sql.push_str(" AND locked = ?");
            params.push(Box::new(locked));
        }

        if let Some(cutoff) = filter.locked_before {
            sql.push_str(" AND locked_dt IS NOT NULL AND locked_dt < ?");
            params.push(Box::new(Self::timestamp_to_millis(cutoff)));
        }

        for (key, value) in &filter.meta {
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM json_each(profile_entries.meta) AS m \
                 WHERE m.key = ? AND m.type = 'text' AND m.value = ?)",
            );
            params.push(Box::new(key.clone()));
            params.push(Box::new(value.clone()));
        }

        (sql, params)
    }

    /// Build a `SET` list for the update
    fn set_clause(update: &EntryUpdate) -> Result<(String, Vec<Box<dyn ToSql>>), StoreError> {
        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(state) = update.lock {
            sets.push("locked = ?");
            params.push(Box::new(state.is_locked()));
            sets.push("locked_dt = ?");
            params.push(Box::new(state.locked_at().map(Self::timestamp_to_millis)));
        }

        if update.increment_use {
            sets.push("use_cnt = use_cnt + 1");
        }

        if update.increment_error {
            sets.push("error_cnt = error_cnt + 1");
        }

        if let Some(meta) = &update.meta {
            sets.push("meta = ?");
            params.push(Box::new(serde_json::to_string(meta)?));
        }

        Ok((sets.join(", "), params))
    }

    fn param_refs(params: &[Box<dyn ToSql>]) -> Vec<&dyn ToSql> {
        params.iter().map(|p| p.as_ref()).collect()
    }
}

impl EntryStore for SqliteStore {
    type Error = StoreError;

    fn insert(&self, entries: Vec<NewEntry>) -> Result<Vec<ProfileEntry>, Self::Error> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = Vec::with_capacity(entries.len());

        {
            let mut stmt = tx.prepare(
                "INSERT INTO profile_entries (id, name, locked, locked_dt, error_cnt, use_cnt, meta, disabled)
                 VALUES (?1, ?2, 0, NULL, 0, 0, ?3, 0)",
            )?;

            for entry in entries {
                let id = EntryId::new();
                stmt.execute(params![
                    id.to_string(),
                    &entry.name,
                    serde_json::to_string(&entry.meta)?,
                ])?;

                inserted.push(ProfileEntry {
                    id,
                    name: entry.name,
                    locked: false,
                    locked_at: None,
                    error_count: 0,
                    use_count: 0,
                    meta: entry.meta,
                    disabled: false,
                });
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn find(&self, filter: &EntryFilter) -> Result<Vec<ProfileEntry>, Self::Error> {
        let (condition, params) = Self::where_clause(filter);
        let sql = format!(
            "SELECT {COLUMNS} FROM profile_entries WHERE {condition} ORDER BY rowid"
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(&Self::param_refs(&params)[..], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn find_one(&self, filter: &EntryFilter) -> Result<Option<ProfileEntry>, Self::Error> {
        let (condition, params) = Self::where_clause(filter);
        let sql = format!(
            "SELECT {COLUMNS} FROM profile_entries WHERE {condition} ORDER BY rowid LIMIT 1"
        );

        let conn = self.conn()?;
        let entry = conn
            .query_row(&sql, &Self::param_refs(&params)[..], Self::row_to_entry)
            .optional()?;

        Ok(entry)
    }

    fn find_one_and_update(
        &self,
        filter: &EntryFilter,
        update: &EntryUpdate,
    ) -> Result<Option<ProfileEntry>, Self::Error> {
        if update.is_noop() {
            return self.find_one(filter);
        }

        let (sets, mut params) = Self::set_clause(update)?;
        let (condition, where_params) = Self::where_clause(filter);
        params.extend(where_params);

        // Selection and mutation in one statement: no other statement can
        // run between them on this connection or any other.
        let sql = format!(
            "UPDATE profile_entries SET {sets}
             WHERE rowid = (SELECT rowid FROM profile_entries WHERE {condition} ORDER BY rowid LIMIT 1)
             RETURNING {COLUMNS}"
        );

        let conn = self.conn()?;
        let entry = conn
            .query_row(&sql, &Self::param_refs(&params)[..], Self::row_to_entry)
            .optional()?;

        Ok(entry)
    }

    fn update_many(&self, filter: &EntryFilter, update: &EntryUpdate) -> Result<usize, Self::Error> {
        if update.is_noop() {
            return self.count(filter);
        }

        let (sets, mut params) = Self::set_clause(update)?;
        let (condition, where_params) = Self::where_clause(filter);
        params.extend(where_params);

        let sql = format!("UPDATE profile_entries SET {sets} WHERE {condition}");

        let conn = self.conn()?;
        let affected = conn.execute(&sql, &Self::param_refs(&params)[..])?;

        Ok(affected)
    }

    fn delete_one(&self, filter: &EntryFilter) -> Result<Option<ProfileEntry>, Self::Error> {
        let (condition, params) = Self::where_clause(filter);
        let sql = format!(
            "DELETE FROM profile_entries
             WHERE rowid = (SELECT rowid FROM profile_entries WHERE {condition} ORDER BY rowid LIMIT 1)
             RETURNING {COLUMNS}"
        );

        let conn = self.conn()?;
        let entry = conn
            .query_row(&sql, &Self::param_refs(&params)[..], Self::row_to_entry)
            .optional()?;

        Ok(entry)
    }

    fn delete_many(&self, filter: &EntryFilter) -> Result<usize, Self::Error> {
        let (condition, params) = Self::where_clause(filter);
        let sql = format!("DELETE FROM profile_entries WHERE {condition}");

        let conn = self.conn()?;
        let removed = conn.execute(&sql, &Self::param_refs(&params)[..])?;

        Ok(removed)
    }

    fn count(&self, filter: &EntryFilter) -> Result<usize, Self::Error> {
        let (condition, params) = Self::where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM profile_entries WHERE {condition}");

        let conn = self.conn()?;
        let count: i64 = conn.query_row(&sql, &Self::param_refs(&params)[..], |row| row.get(0))?;

        Ok(count as usize)
    }
}
