//! Inspect command implementation

use anyhow::Result;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::checkpoint::message::render_value;
use crate::checkpoint::{CheckpointReader, MessageKind};
use crate::cli::truncate;
use crate::config::Config;
use crate::store::CheckpointDb;

#[derive(Debug, Clone)]
pub struct InspectOptions {
    pub namespace: String,
    /// Specific checkpoint instead of the latest one
    pub checkpoint_id: Option<String>,
    pub content_limit: usize,
}

impl InspectOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: config.database.namespace.clone(),
            checkpoint_id: None,
            content_limit: config.display.content_limit,
        }
    }
}

/// Print the message history of a thread's checkpoint.
///
/// Unlike the schema dump and the thread listing, errors here are returned
/// to the caller.
pub fn inspect_thread(
    db_path: &Path,
    thread_id: &str,
    options: &InspectOptions,
    out: &mut dyn Write,
) -> Result<()> {
    let db = CheckpointDb::open(db_path)?;
    let reader = CheckpointReader::new(db.connection(), options.namespace.as_str());

    writeln!(out, "\n--- Inspecting Thread: {} ---", thread_id)?;

    let tuple = match reader.get_tuple(thread_id, options.checkpoint_id.as_deref())? {
        Some(tuple) => tuple,
        None => {
            writeln!(out, "No checkpoint found.")?;
            return Ok(());
        }
    };

    writeln!(out, "Latest Checkpoint ID: {}", tuple.id())?;
    if let Some(parent) = &tuple.parent_checkpoint_id {
        writeln!(out, "Parent Checkpoint ID: {}", parent)?;
    }
    if let Some(created) = tuple.checkpoint.created_at() {
        writeln!(out, "Created At: {}", created.format("%Y-%m-%d %H:%M:%S UTC"))?;
    }
    if let Some(step) = tuple.metadata.step {
        let source = tuple.metadata.source.as_deref().unwrap_or("-");
        writeln!(out, "Step: {} (source: {})", step, source)?;
    }
    if !tuple.pending_writes.is_empty() {
        writeln!(out, "Pending Writes: {}", tuple.pending_writes.len())?;
        for write in &tuple.pending_writes {
            writeln!(out, "    {} -> {}", write.task_id, write.channel)?;
        }
    }

    let messages = match tuple.checkpoint.messages() {
        Some(messages) => messages?,
        None => {
            debug!(
                channels = ?tuple.checkpoint.channel_values.keys().collect::<Vec<_>>(),
                "checkpoint has no messages channel"
            );
            writeln!(out, "No 'messages' key in channel_values.")?;
            return Ok(());
        }
    };

    writeln!(out, "Total Messages: {}", messages.len())?;
    writeln!(out, "\nMessage History:")?;
    for (i, msg) in messages.iter().enumerate() {
        let content = truncate(&msg.content_text(), options.content_limit);
        writeln!(out, "[{}] {}: {}", i, msg.class_name, content)?;

        if let MessageKind::ToolResult {
            tool_call_id,
            artifact,
            ..
        } = &msg.kind
        {
            writeln!(out, "    Tool Call ID: {}", tool_call_id)?;
            writeln!(out, "    Artifact: {}", render_artifact(artifact))?;
        }
    }

    Ok(())
}

/// A tool result without an artifact prints as `None`
fn render_artifact(artifact: &Value) -> String {
    match artifact {
        Value::Null => "None".to_string(),
        other => render_value(other),
    }
}
