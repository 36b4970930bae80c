//! Schema command implementation

use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::store::{format_row, CheckpointDb};

/// Dump every table's columns and first `sample_rows` rows.
///
/// Database errors are written to `out` and end the dump early; only write
/// failures on `out` itself are returned.
pub fn run(db_path: &Path, sample_rows: usize, out: &mut dyn Write) -> Result<()> {
    if let Err(e) = dump(db_path, sample_rows, out) {
        writeln!(out, "{:#}", e)?;
    }
    Ok(())
}

fn dump(db_path: &Path, sample_rows: usize, out: &mut dyn Write) -> Result<()> {
    let db = CheckpointDb::open(db_path)?;

    let tables = db.list_tables()?;
    writeln!(out, "Tables: [{}]", tables.join(", "))?;

    for table in &tables {
        writeln!(out, "\nSchema for {}:", table)?;
        for column in db.table_info(table)? {
            writeln!(out, "{}", column)?;
        }

        writeln!(out, "\nFirst {} rows of {}:", sample_rows, table)?;
        for row in db.sample_rows(table, sample_rows)? {
            writeln!(out, "{}", format_row(&row))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;

    fn dump_to_string(path: &Path) -> String {
        let mut out = Vec::new();
        run(path, 3, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::empty_db(dir.path());

        assert_eq!(dump_to_string(&path), "Tables: []\n");
    }

    #[test]
    fn test_two_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::people_db(dir.path(), 2);

        let expected = "\
Tables: [people]

Schema for people:
(0, 'id', 'INTEGER', 0, NULL, 1)
(1, 'name', 'TEXT', 0, NULL, 0)

First 3 rows of people:
(1, 'person 1')
(2, 'person 2')
";
        assert_eq!(dump_to_string(&path), expected);
    }

    #[test]
    fn test_never_more_than_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::people_db(dir.path(), 10);

        let output = dump_to_string(&path);
        assert!(output.contains("(3, 'person 3')"));
        assert!(!output.contains("(4, 'person 4')"));
    }

    #[test]
    fn test_open_error_is_printed() {
        let dir = tempfile::tempdir().unwrap();
        let output = dump_to_string(&dir.path().join("missing.db"));

        assert!(output.starts_with("Failed to open checkpoint database"));
        assert!(!output.contains("Tables:"));
    }
}
