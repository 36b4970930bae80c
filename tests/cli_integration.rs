//! Integration tests for the checkpeek CLI
//!
//! Each test builds a checkpoint database in a temporary directory and runs
//! the real binary against it.

use rusqlite::{params, Connection};
use serde_json::{json, Value};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run checkpeek inside `dir`, isolated from any user config
fn run_checkpeek(args: &[&str], dir: &Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_checkpeek"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute checkpeek")
}

/// Helper to get stdout as string
fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn message(class_name: &str, kwargs: Value) -> Value {
    json!({
        "lc": 1,
        "type": "constructor",
        "id": ["langchain_core", "messages", class_name],
        "kwargs": kwargs,
    })
}

/// checkpoints.db with threads "1" (two checkpoints) and "2" (one)
fn seed_database(dir: &Path) {
    let conn = Connection::open(dir.join("checkpoints.db")).unwrap();
    conn.execute_batch(checkpeek::store::SAVER_SCHEMA).unwrap();

    let rows = [
        ("1", "cp-1a", json!({"id": "cp-1a", "channel_values": {"messages": []}})),
        (
            "1",
            "cp-1b",
            json!({
                "id": "cp-1b",
                "channel_values": {"messages": [
                    message("HumanMessage", json!({"content": "what is 6 * 7?"})),
                    message("ToolMessage", json!({
                        "content": "42",
                        "tool_call_id": "call_mul",
                        "artifact": null,
                    })),
                ]},
            }),
        ),
        ("2", "cp-2a", json!({"id": "cp-2a", "channel_values": {"counter": 1}})),
    ];
    for (thread_id, checkpoint_id, checkpoint) in rows {
        conn.execute(
            "INSERT INTO checkpoints
             (thread_id, checkpoint_ns, checkpoint_id, parent_checkpoint_id, type, checkpoint, metadata)
             VALUES (?, '', ?, NULL, 'json', ?, ?)",
            params![
                thread_id,
                checkpoint_id,
                serde_json::to_vec(&checkpoint).unwrap(),
                b"{}".to_vec(),
            ],
        )
        .unwrap();
    }
}

// =============================================================================
// Basic Command Tests
// =============================================================================

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    let output = run_checkpeek(&["--help"], dir.path());

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("checkpeek"));
    assert!(out.contains("schema"));
    assert!(out.contains("inspect"));
}

// =============================================================================
// Default Report
// =============================================================================

#[test]
fn test_default_run_writes_report_file() {
    let dir = TempDir::new().unwrap();
    seed_database(dir.path());

    let output = run_checkpeek(&[], dir.path());
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());

    let report = std::fs::read_to_string(dir.path().join("db_output_utf8.txt")).unwrap();
    assert!(report.starts_with("--- Available Threads ---\n"));
    assert!(report.contains("Thread ID: 1 (Checkpoints: 2)\n"));
    assert!(report.contains("Thread ID: 2 (Checkpoints: 1)\n"));
    assert!(report.contains("--- Inspecting Thread: 1 ---\n"));
    assert!(report.contains("Latest Checkpoint ID: cp-1b\n"));
    assert!(report.contains(
        "[1] ToolMessage: 42\n    Tool Call ID: call_mul\n    Artifact: None\n"
    ));
}

#[test]
fn test_report_output_override() {
    let dir = TempDir::new().unwrap();
    seed_database(dir.path());

    let output = run_checkpeek(&["report", "--output", "custom.txt"], dir.path());
    assert!(output.status.success());
    assert!(dir.path().join("custom.txt").exists());
    assert!(!dir.path().join("db_output_utf8.txt").exists());
}

#[test]
fn test_report_with_missing_database() {
    let dir = TempDir::new().unwrap();

    let output = run_checkpeek(&[], dir.path());
    assert!(output.status.success());

    let report = std::fs::read_to_string(dir.path().join("db_output_utf8.txt")).unwrap();
    assert!(report.contains("Error listing threads: "));
    assert!(!report.contains("Inspecting Thread"));
    assert!(!dir.path().join("checkpoints.db").exists());
}

// =============================================================================
// Subcommands
// =============================================================================

#[test]
fn test_schema_command() {
    let dir = TempDir::new().unwrap();
    seed_database(dir.path());

    let output = run_checkpeek(&["schema"], dir.path());
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("Tables: [checkpoints, writes]\n"));
    assert!(out.contains("Schema for checkpoints:\n(0, 'thread_id', 'TEXT', 1, NULL, 1)\n"));
    assert!(out.contains("First 3 rows of writes:\n"));
}

#[test]
fn test_config_flag_after_subcommand() {
    let dir = TempDir::new().unwrap();
    seed_database(dir.path());
    std::fs::write(dir.path().join("custom.yaml"), "display:\n  sample_rows: 1\n").unwrap();

    let output = run_checkpeek(&["schema", "--config", "custom.yaml"], dir.path());
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("First 1 rows of checkpoints:\n"));
    assert!(!out.contains("First 3 rows"));
}

#[test]
fn test_inspect_command_without_messages() {
    let dir = TempDir::new().unwrap();
    seed_database(dir.path());

    let output = run_checkpeek(&["inspect", "2"], dir.path());
    assert!(output.status.success());
    assert!(stdout(&output).ends_with("No 'messages' key in channel_values.\n"));
}

#[test]
fn test_inspect_error_exits_nonzero() {
    let dir = TempDir::new().unwrap();

    let output = run_checkpeek(&["inspect", "1", "--db", "missing.db"], dir.path());
    assert!(!output.status.success());
}

#[test]
fn test_history_command() {
    let dir = TempDir::new().unwrap();
    seed_database(dir.path());

    let output = run_checkpeek(&["history", "1"], dir.path());
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("cp-1b  parent=-"));
    assert!(out.find("cp-1b").unwrap() < out.find("cp-1a").unwrap());
}
