//! CSV export of report records.
//!
//! One row per flattened `custom` field of every datum, sorted by timestamp.
//! Text fields, `thread_id` included, are double-quoted.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::extraction::value_to_string;
use crate::report::datum::Datum;

pub const CSV_HEADER: &str = "timestamp, suite_id, operation_id, thread_id, cpu_id, datum_id, value";

#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub timestamp: i64,
    pub suite_id: String,
    pub operation_id: String,
    pub thread_id: String,
    pub cpu_id: u32,
    pub datum_id: String,
    pub value: String,
}

impl fmt::Display for CsvRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}, {}",
            self.timestamp,
            quote(&self.suite_id),
            quote(&self.operation_id),
            quote(&self.thread_id),
            self.cpu_id,
            quote(&self.datum_id),
            quote(&self.value)
        )
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Rows for every (field, value) pair of `data`, stably sorted by timestamp.
pub fn to_csv_rows(data: &[Datum]) -> Vec<CsvRow> {
    let mut rows: Vec<CsvRow> = data
        .iter()
        .flat_map(|d| {
            d.flattened_fields().iter().map(move |(field, value)| CsvRow {
                timestamp: d.timestamp(),
                suite_id: d.suite_id().to_string(),
                operation_id: d.operation_id().to_string(),
                thread_id: d.thread_id().to_string(),
                cpu_id: d.cpu_id(),
                datum_id: field.clone(),
                value: value_to_string(value),
            })
        })
        .collect();
    rows.sort_by_key(|r| r.timestamp);
    rows
}

pub fn write_csv(path: &Path, data: &[Datum]) -> Result<usize> {
    let rows = to_csv_rows(data);
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", CSV_HEADER)?;
    for row in &rows {
        writeln!(out, "{}", row)?;
    }
    out.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn datum(ts: i64, custom: Value) -> Datum {
        let custom: Map<String, Value> = match custom {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        Datum::new(0, "Suite", "Op", "7", 1, ts, custom)
    }

    #[test]
    fn test_rows_sorted_and_flattened() {
        let data = vec![
            datum(20, json!({"b": {"c": 2}})),
            datum(10, json!({"a": "x", "z": true})),
        ];
        let rows = to_csv_rows(&data);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].timestamp, 10);
        assert_eq!(rows[0].datum_id, "a");
        assert_eq!(rows[1].datum_id, "z");
        assert_eq!(rows[1].value, "true");
        assert_eq!(rows[2].datum_id, "b.c");
    }

    #[test]
    fn test_row_format() {
        let rows = to_csv_rows(&[datum(5, json!({"msg": "say \"hi\""}))]);
        assert_eq!(
            rows[0].to_string(),
            r#"5, "Suite", "Op", "7", 1, "msg", "say ""hi""""#
        );
    }

    #[test]
    fn test_thread_id_with_comma_stays_one_field() {
        let mut custom = Map::new();
        custom.insert("a".into(), json!(1));
        let d = Datum::new(0, "Suite", "Op", "RenderThread, 2", 1, 5, custom);

        let row = to_csv_rows(&[d]).remove(0).to_string();
        assert_eq!(row, r#"5, "Suite", "Op", "RenderThread, 2", 1, "a", "1""#);
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let n = write_csv(&path, &[datum(1, json!({"a": 1}))]).unwrap();
        assert_eq!(n, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(CSV_HEADER));
        assert_eq!(text.lines().count(), 2);
    }
}
