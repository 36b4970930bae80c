//! Default run: thread listing plus one inspection, written to a report file

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::cli::inspect::{inspect_thread, InspectOptions};
use crate::cli::threads::list_threads;
use crate::config::Config;

pub fn run(config: &Config, output: &Path) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("Failed to create report file {}", output.display()))?;
    info!(path = %output.display(), "writing report");

    let mut out = BufWriter::new(file);
    write_report(config, &mut out)?;
    out.flush()
        .with_context(|| format!("Failed to write report file {}", output.display()))?;
    Ok(())
}

/// List threads, then inspect the preferred one (or the first listed)
pub fn write_report(config: &Config, out: &mut dyn Write) -> Result<()> {
    let db_path = config.database_path();
    let threads = list_threads(&db_path, out)?;

    if let Some(target) = select_thread(&threads, &config.report.preferred_thread) {
        info!(thread_id = target, "inspecting thread");
        inspect_thread(&db_path, target, &InspectOptions::from_config(config), out)?;
    }

    Ok(())
}

pub fn select_thread<'a>(threads: &'a [String], preferred: &str) -> Option<&'a str> {
    threads
        .iter()
        .find(|t| t.as_str() == preferred)
        .or_else(|| threads.first())
        .map(String::as_str)
}
