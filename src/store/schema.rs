//! Table layout written by the agent framework's SQLite checkpoint saver.
//!
//! checkpeek never creates these tables in a real database. The layout is
//! kept here so lookups name the same tables and columns the saver does, and
//! so tests can build realistic fixtures.

pub const CHECKPOINTS_TABLE: &str = "checkpoints";
pub const WRITES_TABLE: &str = "writes";

pub const SAVER_SCHEMA: &str = r#"
-- One row per checkpoint; checkpoint/metadata hold serialized blobs
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id TEXT NOT NULL,
    checkpoint_ns TEXT NOT NULL DEFAULT '',
    checkpoint_id TEXT NOT NULL,
    parent_checkpoint_id TEXT,
    type TEXT,                             -- 'json' | 'msgpack'
    checkpoint BLOB,
    metadata BLOB,
    PRIMARY KEY (thread_id, checkpoint_ns, checkpoint_id)
);

-- Pending channel writes recorded against a checkpoint
CREATE TABLE IF NOT EXISTS writes (
    thread_id TEXT NOT NULL,
    checkpoint_ns TEXT NOT NULL DEFAULT '',
    checkpoint_id TEXT NOT NULL,
    task_id TEXT NOT NULL,
    idx INTEGER NOT NULL,
    channel TEXT NOT NULL,
    type TEXT,
    value BLOB,
    PRIMARY KEY (thread_id, checkpoint_ns, checkpoint_id, task_id, idx)
);
"#;
