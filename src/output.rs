//! CSV export of aggregate tables and JSON printing for the CLI.
//!
//! Every field is double-quoted and internal quotes are doubled. The
//! header row is the first row's keys, in order.

use anyhow::{Result, bail};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::debug;

use crate::analyzers::types::RawRow;

/// Writes any serializable value to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    debug!(bytes = json.len(), "Printing JSON output");
    println!("{json}");
    Ok(())
}

/// Text form of a cell: strings as-is, null as empty, other scalars via JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn header(rows: &[RawRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

fn write_rows<W: std::io::Write>(
    writer: W,
    headers: &[String],
    rows: &[RawRow],
    with_header: bool,
) -> Result<W> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    if with_header {
        writer.write_record(headers)?;
    }

    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|key| row.get(key).map(cell_text).unwrap_or_default()),
        )?;
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV writer flush failed: {}", e.error()))
}

/// Serializes rows to CSV. An empty table yields an empty string.
pub fn to_csv(rows: &[RawRow]) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }

    let headers = header(rows);
    let bytes = write_rows(Vec::new(), &headers, rows, true)?;
    Ok(String::from_utf8(bytes)?)
}

/// Parses CSV produced by [`to_csv`] back into rows of string cells.
pub fn parse_csv(text: &str) -> Result<Vec<RawRow>> {
    let mut reader = ReaderBuilder::new().from_reader(text.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), Value::from(v)))
                .collect(),
        );
    }

    Ok(rows)
}

/// Header of an existing CSV file, or `None` when the file is empty.
fn existing_header(path: &str) -> Result<Option<Vec<String>>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    Ok(if headers.is_empty() { None } else { Some(headers) })
}

/// Appends rows to a CSV file.
///
/// Creates the file with headers if it does not already exist. Rows are
/// written in the existing header's column order; a row carrying a column
/// the header lacks is an error and nothing is written.
pub fn append_csv(path: &str, rows: &[RawRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let existing = if Path::new(path).exists() {
        existing_header(path)?
    } else {
        None
    };
    debug!(
        path,
        file_exists = existing.is_some(),
        rows = rows.len(),
        "Appending CSV rows"
    );

    let write_header = existing.is_none();
    let headers = existing.unwrap_or_else(|| header(rows));

    for row in rows {
        if let Some(key) = row.keys().find(|key| !headers.contains(*key)) {
            bail!("column '{key}' is not in the header of {path}");
        }
    }

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    write_rows(file, &headers, rows, write_header)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn rows() -> Vec<RawRow> {
        vec![
            json!({"name": "Today", "Makkah": 55.0, "note": "say \"hi\""}),
            json!({"name": "Yesterday", "Makkah": 41, "note": null}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&rows()).unwrap();
    }

    #[test]
    fn test_to_csv_quotes_everything() {
        let csv = to_csv(&rows()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], r#""name","Makkah","note""#);
        assert_eq!(lines[1], r#""Today","55.0","say ""hi""""#);
        assert_eq!(lines[2], r#""Yesterday","41","""#);
    }

    #[test]
    fn test_to_csv_empty() {
        assert_eq!(to_csv(&[]).unwrap(), "");
    }

    #[test]
    fn test_csv_round_trip_as_strings() {
        let original = rows();
        let parsed = parse_csv(&to_csv(&original).unwrap()).unwrap();

        let expected: Vec<RawRow> = original
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| (k.clone(), Value::from(cell_text(v))))
                    .collect()
            })
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_append_csv_writes_header_once() {
        let path = temp_path("cow_energy_test_append.csv");
        let _ = fs::remove_file(&path);

        append_csv(&path, &rows()).unwrap();
        append_csv(&path, &rows()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("\"name\"")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 5);

        fs::remove_file(&path).unwrap();
    }

    fn record(value: serde_json::Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_append_csv_follows_existing_header() {
        let path = temp_path("cow_energy_test_append_groups.csv");
        let _ = fs::remove_file(&path);

        append_csv(
            &path,
            &[record(json!({"name": "Today", "date": "Today", "Makkah": 55.0, "gen_Makkah": 47.5}))],
        )
        .unwrap();
        append_csv(
            &path,
            &[record(json!({"gen_Makkah": 40.0, "date": "Today", "name": "Today"}))],
        )
        .unwrap();

        let parsed = parse_csv(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["Makkah"], "");
        assert_eq!(parsed[1]["gen_Makkah"], "40.0");
        assert_eq!(parsed[1]["name"], "Today");

        let err = append_csv(
            &path,
            &[record(json!({"name": "Today", "date": "Today", "Riyadh": 70.0, "gen_Riyadh": 40.0}))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("Riyadh"));

        let parsed = parse_csv(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);

        fs::remove_file(&path).unwrap();
    }
}
