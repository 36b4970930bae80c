//! Test databases laid out the way the checkpoint saver writes them.

use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::SAVER_SCHEMA;

pub fn empty_db(dir: &Path) -> PathBuf {
    let path = dir.join("empty.db");
    let conn = Connection::open(&path).unwrap();
    // Touch the file so it is a valid database with zero tables
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    path
}

/// A single `people (id INTEGER PRIMARY KEY, name TEXT)` table with `rows` rows
pub fn people_db(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("people.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT);")
        .unwrap();
    for i in 1..=rows {
        conn.execute(
            "INSERT INTO people (id, name) VALUES (?, ?)",
            params![i as i64, format!("person {}", i)],
        )
        .unwrap();
    }
    path
}

pub fn saver_db(dir: &Path) -> (PathBuf, Connection) {
    let path = dir.join("checkpoints.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SAVER_SCHEMA).unwrap();
    (path, conn)
}

/// Insert a JSON-typed checkpoint in the root namespace
pub fn insert_checkpoint(
    conn: &Connection,
    thread_id: &str,
    checkpoint_id: &str,
    parent_id: Option<&str>,
    checkpoint: &Value,
    metadata: &Value,
) {
    insert_typed_checkpoint(
        conn,
        thread_id,
        checkpoint_id,
        parent_id,
        "json",
        &serde_json::to_vec(checkpoint).unwrap(),
        metadata,
    );
}

pub fn insert_typed_checkpoint(
    conn: &Connection,
    thread_id: &str,
    checkpoint_id: &str,
    parent_id: Option<&str>,
    type_tag: &str,
    blob: &[u8],
    metadata: &Value,
) {
    conn.execute(
        "INSERT INTO checkpoints
         (thread_id, checkpoint_ns, checkpoint_id, parent_checkpoint_id, type, checkpoint, metadata)
         VALUES (?, '', ?, ?, ?, ?, ?)",
        params![
            thread_id,
            checkpoint_id,
            parent_id,
            type_tag,
            blob,
            serde_json::to_vec(metadata).unwrap(),
        ],
    )
    .unwrap();
}

pub fn insert_write(
    conn: &Connection,
    thread_id: &str,
    checkpoint_id: &str,
    task_id: &str,
    idx: i64,
    channel: &str,
    value: &Value,
) {
    insert_raw_write(
        conn,
        thread_id,
        checkpoint_id,
        task_id,
        idx,
        channel,
        "json",
        &serde_json::to_vec(value).unwrap(),
    );
}

/// Insert a write with an arbitrary type tag, e.g. `bytes` with a raw payload
#[allow(clippy::too_many_arguments)]
pub fn insert_raw_write(
    conn: &Connection,
    thread_id: &str,
    checkpoint_id: &str,
    task_id: &str,
    idx: i64,
    channel: &str,
    type_tag: &str,
    blob: &[u8],
) {
    conn.execute(
        "INSERT INTO writes
         (thread_id, checkpoint_ns, checkpoint_id, task_id, idx, channel, type, value)
         VALUES (?, '', ?, ?, ?, ?, ?, ?)",
        params![thread_id, checkpoint_id, task_id, idx, channel, type_tag, blob],
    )
    .unwrap();
}

/// A serialized message in constructor form
pub fn message(class_name: &str, kwargs: Value) -> Value {
    serde_json::json!({
        "lc": 1,
        "type": "constructor",
        "id": ["langchain_core", "messages", class_name],
        "kwargs": kwargs,
    })
}
