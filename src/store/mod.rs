//! Read-only access to a checkpoint database
//!
//! Raw SQLite queries used by the schema dump and the thread listing. Decoding
//! of checkpoint blobs lives in `crate::checkpoint`.

mod schema;

#[cfg(test)]
pub(crate) mod fixtures;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags};
use std::fmt;
use std::path::Path;
use tracing::debug;

pub use schema::{CHECKPOINTS_TABLE, SAVER_SCHEMA, WRITES_TABLE};

pub struct CheckpointDb {
    conn: Connection,
}

impl CheckpointDb {
    /// Open database in read-only mode
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening checkpoint database");
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open checkpoint database {}", path.display()))?;
        Ok(Self { conn })
    }

    /// The raw connection, for readers that decode the saver's blobs
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ============================================
    // SCHEMA
    // ============================================

    /// Table names in catalog order
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn table_info(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let rows = stmt.query_map([], |row| {
            Ok(ColumnInfo {
                cid: row.get(0)?,
                name: row.get(1)?,
                decl_type: row.get(2)?,
                not_null: row.get(3)?,
                default_value: row.get(4)?,
                primary_key: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// First `limit` rows of a table, every column as its raw SQLite value
    pub fn sample_rows(&self, table: &str, limit: usize) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT ?", quote_ident(table)))?;
        let width = stmt.column_count();

        let mut rows = stmt.query(params![limit as i64])?;
        let mut sampled = vec![];
        while let Some(row) = rows.next()? {
            let values = (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Vec<_>, _>>()?;
            sampled.push(values);
        }
        Ok(sampled)
    }

    // ============================================
    // THREADS
    // ============================================

    /// Distinct thread ids, in the order SQLite returns them
    pub fn distinct_threads(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT thread_id FROM {}",
            CHECKPOINTS_TABLE
        ))?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count_checkpoints(&self, thread_id: &str) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE thread_id = ?", CHECKPOINTS_TABLE),
            params![thread_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ============================================
// ROW TYPES
// ============================================

/// One row of `PRAGMA table_info`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    pub decl_type: String,
    pub not_null: bool,
    pub default_value: Value,
    pub primary_key: i64,
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {})",
            self.cid,
            format_value(&Value::Text(self.name.clone())),
            format_value(&Value::Text(self.decl_type.clone())),
            u8::from(self.not_null),
            format_value(&self.default_value),
            self.primary_key
        )
    }
}

/// Render a value the way it would be written as a SQL literal
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => format!("{:?}", r),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Blob(b) => format!("X'{}'", hex::encode_upper(b)),
    }
}

pub fn format_row(values: &[Value]) -> String {
    let cells: Vec<String> = values.iter().map(format_value).collect();
    format!("({})", cells.join(", "))
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Quote an identifier for interpolation into SQL
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
