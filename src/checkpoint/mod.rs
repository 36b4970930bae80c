//! Checkpoint reader
//!
//! Reads checkpoints the way the agent framework's SQLite saver stores them:
//! one row per `(thread_id, checkpoint_ns, checkpoint_id)` with typed blobs,
//! plus pending writes in a side table. Checkpoint ids sort chronologically,
//! so the latest checkpoint is the greatest id.

pub mod codec;
pub mod message;

pub use codec::DecodeError;
pub use message::{Message, MessageKind};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::store::{table_exists, CHECKPOINTS_TABLE, WRITES_TABLE};

pub const MESSAGES_CHANNEL: &str = "messages";

/// Reader bound to an already open connection
pub struct CheckpointReader<'a> {
    conn: &'a Connection,
    namespace: String,
}

/// Decoded checkpoint blob
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Checkpoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub channel_values: Map<String, Value>,
}

impl Checkpoint {
    /// Messages in the `messages` channel, or `None` when the channel is absent
    pub fn messages(&self) -> Option<Result<Vec<Message>, DecodeError>> {
        self.channel_values
            .get(MESSAGES_CHANNEL)
            .map(message::parse_messages)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.ts
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckpointMetadata {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub step: Option<i64>,
}

/// A write recorded against a checkpoint; the written value stays undecoded
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub task_id: String,
    pub channel: String,
}

#[derive(Debug, Clone)]
pub struct CheckpointTuple {
    pub checkpoint_id: String,
    pub parent_checkpoint_id: Option<String>,
    pub checkpoint: Checkpoint,
    pub metadata: CheckpointMetadata,
    pub pending_writes: Vec<PendingWrite>,
}

impl CheckpointTuple {
    /// Id recorded inside the blob, falling back to the row key
    pub fn id(&self) -> &str {
        if self.checkpoint.id.is_empty() {
            &self.checkpoint_id
        } else {
            &self.checkpoint.id
        }
    }
}

/// History entry; blobs other than metadata are left undecoded
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub checkpoint_id: String,
    pub parent_checkpoint_id: Option<String>,
    pub metadata: CheckpointMetadata,
}

struct RawCheckpointRow {
    checkpoint_id: String,
    parent_checkpoint_id: Option<String>,
    type_tag: Option<String>,
    checkpoint: Option<Vec<u8>>,
    metadata: Option<Vec<u8>>,
}

const SELECT_CHECKPOINT: &str = "SELECT checkpoint_id, parent_checkpoint_id, type, \
     checkpoint, metadata FROM checkpoints";

impl<'a> CheckpointReader<'a> {
    pub fn new(conn: &'a Connection, namespace: impl Into<String>) -> Self {
        Self {
            conn,
            namespace: namespace.into(),
        }
    }

    /// Latest checkpoint of a thread, or the one named by `checkpoint_id`
    pub fn get_tuple(
        &self,
        thread_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<Option<CheckpointTuple>> {
        debug!(thread_id, ?checkpoint_id, ns = %self.namespace, "fetching checkpoint");

        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<RawCheckpointRow> {
            Ok(RawCheckpointRow {
                checkpoint_id: row.get(0)?,
                parent_checkpoint_id: row.get(1)?,
                type_tag: row.get(2)?,
                checkpoint: row.get(3)?,
                metadata: row.get(4)?,
            })
        };

        let result = match checkpoint_id {
            Some(id) => self.conn.query_row(
                &format!(
                    "{} WHERE thread_id = ? AND checkpoint_ns = ? AND checkpoint_id = ?",
                    SELECT_CHECKPOINT
                ),
                params![thread_id, self.namespace, id],
                map_row,
            ),
            None => self.conn.query_row(
                &format!(
                    "{} WHERE thread_id = ? AND checkpoint_ns = ? \
                     ORDER BY checkpoint_id DESC LIMIT 1",
                    SELECT_CHECKPOINT
                ),
                params![thread_id, self.namespace],
                map_row,
            ),
        };

        let raw = match result {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e).context("Failed to query checkpoints"),
        };

        let value = codec::loads_typed(
            raw.type_tag.as_deref(),
            raw.checkpoint.as_deref().unwrap_or_default(),
        )
        .with_context(|| format!("Failed to decode checkpoint {}", raw.checkpoint_id))?;
        let checkpoint: Checkpoint = match value {
            Value::Null => Checkpoint::default(),
            other => serde_json::from_value(other)
                .with_context(|| format!("Malformed checkpoint {}", raw.checkpoint_id))?,
        };

        let pending_writes = self.pending_writes(thread_id, &raw.checkpoint_id)?;

        Ok(Some(CheckpointTuple {
            metadata: decode_metadata(&raw.checkpoint_id, raw.metadata.as_deref()),
            checkpoint_id: raw.checkpoint_id,
            parent_checkpoint_id: raw.parent_checkpoint_id,
            checkpoint,
            pending_writes,
        }))
    }

    /// Writes recorded against a checkpoint, ordered by task then index.
    /// Values are not decoded: the saver also stores raw bytes there.
    pub fn pending_writes(&self, thread_id: &str, checkpoint_id: &str) -> Result<Vec<PendingWrite>> {
        if !table_exists(self.conn, WRITES_TABLE)? {
            debug!("no writes table, skipping pending writes");
            return Ok(vec![]);
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT task_id, channel FROM {} \
             WHERE thread_id = ? AND checkpoint_ns = ? AND checkpoint_id = ? \
             ORDER BY task_id, idx",
            WRITES_TABLE
        ))?;
        let rows = stmt.query_map(params![thread_id, self.namespace, checkpoint_id], |row| {
            Ok(PendingWrite {
                task_id: row.get(0)?,
                channel: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Newest-first checkpoint history of a thread
    pub fn list(&self, thread_id: &str, limit: usize) -> Result<Vec<CheckpointSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT checkpoint_id, parent_checkpoint_id, metadata FROM {} \
             WHERE thread_id = ? AND checkpoint_ns = ? \
             ORDER BY checkpoint_id DESC LIMIT ?",
            CHECKPOINTS_TABLE
        ))?;
        let rows = stmt.query_map(params![thread_id, self.namespace, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<Vec<u8>>>(2)?,
            ))
        })?;

        let mut history = vec![];
        for row in rows {
            let (checkpoint_id, parent_checkpoint_id, metadata) = row?;
            history.push(CheckpointSummary {
                metadata: decode_metadata(&checkpoint_id, metadata.as_deref()),
                checkpoint_id,
                parent_checkpoint_id,
            });
        }
        Ok(history)
    }
}

/// Metadata is informational; an unreadable blob degrades to empty metadata
fn decode_metadata(checkpoint_id: &str, blob: Option<&[u8]>) -> CheckpointMetadata {
    let Some(blob) = blob else {
        return CheckpointMetadata::default();
    };
    let parsed = codec::loads_metadata(blob)
        .map_err(anyhow::Error::from)
        .and_then(|value| serde_json::from_value(value).map_err(anyhow::Error::from));
    match parsed {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(checkpoint_id, error = %e, "unreadable checkpoint metadata");
            CheckpointMetadata::default()
        }
    }
}
