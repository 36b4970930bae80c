//! History command implementation

use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::checkpoint::CheckpointReader;
use crate::store::CheckpointDb;

pub fn run(
    db_path: &Path,
    namespace: &str,
    thread_id: &str,
    limit: usize,
    out: &mut dyn Write,
) -> Result<()> {
    let db = CheckpointDb::open(db_path)?;
    let history = CheckpointReader::new(db.connection(), namespace).list(thread_id, limit)?;

    if history.is_empty() {
        writeln!(out, "No checkpoints found for thread '{}'.", thread_id)?;
        return Ok(());
    }

    writeln!(out, "--- Checkpoint History: {} ---", thread_id)?;
    for entry in history {
        let step = entry
            .metadata
            .step
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{}  parent={}  step={}  source={}",
            entry.checkpoint_id,
            entry.parent_checkpoint_id.as_deref().unwrap_or("-"),
            step,
            entry.metadata.source.as_deref().unwrap_or("-"),
        )?;
    }

    Ok(())
}
