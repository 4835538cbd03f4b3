//! CSV export query: reconcile heterogeneous records into one table
//!
//! Column policy is the discovered schema: the union of every field name
//! seen across all parseable records, plus a synthetic capture-time column.
//! The policy is held invariant; the fixed-list alternative silently drops
//! unknown fields, this one never does. Column order is deterministic
//! (capture time first, then field names sorted), so re-running the export
//! against an unchanged store yields byte-identical output.

use std::collections::BTreeSet;

use csv::WriterBuilder;
use tracing::debug;

use crate::store::{ResponseStore, StoreError, StoredRecord};

/// Name of the synthetic capture-time column.
pub const TIME_COLUMN: &str = "Time";

/// Rendering of the capture timestamp inside the time column.
const TIME_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Byte-order marker prepended for downstream spreadsheet tools.
const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Errors that can occur when exporting responses
#[derive(Debug, thiserror::Error)]
pub enum ExportCsvError {
    #[error("unable to read responses: {0}")]
    List(#[from] StoreError),

    #[error("unable to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unable to encode CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// Handler function for the export query.
///
/// Takes a fresh snapshot of the store; records committed mid-scan may or
/// may not appear in this one export.
pub async fn handle(store: &ResponseStore) -> Result<Vec<u8>, ExportCsvError> {
    let records = store.list_all().await?;
    debug!(records = records.len(), "exporting responses");
    render(&records)
}

/// Render records into a rectangular CSV document, BOM included.
///
/// One header row, one row per record in ascending identifier order; fields
/// absent from a record render as empty cells.
pub fn render(records: &[StoredRecord]) -> Result<Vec<u8>, ExportCsvError> {
    let columns = discover_columns(records);

    let mut buf = Vec::new();
    buf.extend_from_slice(UTF8_BOM);
    {
        let mut writer = WriterBuilder::new().from_writer(&mut buf);
        writer.write_record(&columns)?;

        for stored in records {
            let row: Vec<String> = columns
                .iter()
                .map(|column| {
                    if column == TIME_COLUMN {
                        stored
                            .id
                            .received_at()
                            .map(|ts| ts.format(TIME_DISPLAY_FORMAT).to_string())
                            .unwrap_or_default()
                    } else {
                        stored.record.get(column).unwrap_or_default().to_string()
                    }
                })
                .collect();
            writer.write_record(&row)?;
        }

        writer.flush()?;
    }

    Ok(buf)
}

/// Union of all field names across records, in deterministic column order:
/// the capture-time column first, then field names sorted lexicographically.
fn discover_columns(records: &[StoredRecord]) -> Vec<String> {
    let mut names = BTreeSet::new();
    for stored in records {
        names.extend(stored.record.field_names().map(str::to_string));
    }
    // A client-submitted field of the same name would collide with the
    // synthetic column; the synthetic one wins.
    names.remove(TIME_COLUMN);

    let mut columns = Vec::with_capacity(names.len() + 1);
    columns.push(TIME_COLUMN.to_string());
    columns.extend(names);
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordId;
    use survey_common::types::Record;

    fn stored(stem: &str, fields: &[(&str, &str)]) -> StoredRecord {
        let mut record = Record::new();
        for (name, value) in fields {
            record.set(*name, *value);
        }
        StoredRecord {
            id: RecordId::from_stem(stem).unwrap(),
            record,
        }
    }

    fn lines(csv: &[u8]) -> Vec<String> {
        let text = String::from_utf8(csv[3..].to_vec()).unwrap();
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_render_starts_with_bom() {
        let csv = render(&[]).unwrap();
        assert_eq!(&csv[..3], b"\xef\xbb\xbf");
    }

    #[test]
    fn test_empty_store_renders_header_only() {
        let csv = render(&[]).unwrap();
        assert_eq!(lines(&csv), vec!["Time".to_string()]);
    }

    #[test]
    fn test_columns_are_union_in_deterministic_order() {
        let records = vec![
            stored("20240101_100000.000", &[("gender", "F"), ("age", "22")]),
            stored("20240101_100001.000", &[("city", "Berlin")]),
        ];

        let csv = render(&records).unwrap();
        let lines = lines(&csv);
        assert_eq!(lines[0], "Time,age,city,gender");
    }

    #[test]
    fn test_rows_are_rectangular_with_empty_cells() {
        let records = vec![
            stored("20240101_100000.000", &[("gender", "F"), ("age", "22")]),
            stored("20240101_100001.000", &[("city", "Berlin")]),
        ];

        let csv = render(&records).unwrap();
        let lines = lines(&csv);
        assert_eq!(lines[1], "2024-01-01 10:00:00.000,22,,F");
        assert_eq!(lines[2], "2024-01-01 10:00:01.000,,Berlin,");
    }

    #[test]
    fn test_render_is_deterministic() {
        let records = vec![
            stored("20240101_100000.000", &[("b", "2"), ("a", "1")]),
            stored("20240101_100001.000", &[("c", "3")]),
        ];

        assert_eq!(render(&records).unwrap(), render(&records).unwrap());
    }

    #[test]
    fn test_client_supplied_time_field_yields_to_synthetic_column() {
        let records = vec![stored("20240101_100000.000", &[("Time", "spoofed")])];

        let csv = render(&records).unwrap();
        let lines = lines(&csv);
        assert_eq!(lines[0], "Time");
        assert_eq!(lines[1], "2024-01-01 10:00:00.000");
    }

    #[test]
    fn test_values_with_commas_are_quoted() {
        let records = vec![stored("20240101_100000.000", &[("comment", "a, b")])];

        let csv = render(&records).unwrap();
        let lines = lines(&csv);
        assert_eq!(lines[1], "2024-01-01 10:00:00.000,\"a, b\"");
    }
}
