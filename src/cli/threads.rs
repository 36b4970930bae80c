//! Threads command implementation

use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::store::CheckpointDb;

/// List distinct threads with their checkpoint counts.
///
/// Returns the thread ids in query order. Database errors are written to
/// `out` and yield an empty list; lines printed before the error stay.
pub fn list_threads(db_path: &Path, out: &mut dyn Write) -> Result<Vec<String>> {
    writeln!(out, "--- Available Threads ---")?;

    let listed = CheckpointDb::open(db_path).and_then(|db| {
        let thread_ids = db.distinct_threads()?;
        print_counts(thread_ids, |thread_id| db.count_checkpoints(thread_id), &mut *out)
    });

    match listed {
        Ok(thread_ids) => Ok(thread_ids),
        Err(e) => {
            writeln!(out, "Error listing threads: {:#}", e)?;
            Ok(vec![])
        }
    }
}

/// Print one line per thread as soon as its count is known
fn print_counts<F>(thread_ids: Vec<String>, mut count: F, out: &mut dyn Write) -> Result<Vec<String>>
where
    F: FnMut(&str) -> Result<i64>,
{
    if thread_ids.is_empty() {
        writeln!(out, "No threads found in database.")?;
        return Ok(vec![]);
    }

    let mut listed = Vec::with_capacity(thread_ids.len());
    for thread_id in thread_ids {
        let checkpoints = count(&thread_id)?;
        writeln!(out, "Thread ID: {} (Checkpoints: {})", thread_id, checkpoints)?;
        listed.push(thread_id);
    }
    Ok(listed)
}
