//! Command implementations
//!
//! Every command writes to an explicit sink so the report run can send the
//! same output to a file.

pub mod history;
pub mod inspect;
pub mod report;
pub mod schema;
pub mod threads;

/// Cut `text` to `limit` characters, marking the cut with `...`
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
