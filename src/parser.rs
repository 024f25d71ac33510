//! Spreadsheet export parser.
//!
//! Normalises the two export formats a sheet can be served in (gviz
//! JSONP and plain CSV), plus an already-shaped JSON row array, into
//! the same `Vec<RawRow>`.

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::analyzers::types::RawRow;

const GVIZ_CALLBACK: &str = "google.visualization.Query.setResponse(";
const GVIZ_GUARD: &str = "/*O_o*/";

static SHEET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://docs\.google\.com/spreadsheets/d/([A-Za-z0-9_-]+)").expect("static regex")
});
static SHEET_GID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#&?]gid=(\d+)").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Gviz,
    Json,
    Csv,
}

impl SheetFormat {
    /// Sniffs the export format from the response body.
    pub fn detect(body: &str) -> Self {
        let trimmed = body.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with(GVIZ_GUARD) || trimmed.contains(GVIZ_CALLBACK) {
            SheetFormat::Gviz
        } else if trimmed.starts_with('[') {
            SheetFormat::Json
        } else {
            SheetFormat::Csv
        }
    }
}

#[derive(Deserialize)]
struct GvizResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    table: Option<GvizTable>,
}

#[derive(Deserialize)]
struct GvizTable {
    #[serde(default)]
    cols: Vec<GvizCol>,
    #[serde(default)]
    rows: Vec<GvizRow>,
}

#[derive(Deserialize)]
struct GvizCol {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label: String,
}

#[derive(Deserialize)]
struct GvizRow {
    #[serde(default)]
    c: Vec<Option<GvizCell>>,
}

#[derive(Deserialize)]
struct GvizCell {
    #[serde(default)]
    v: Value,
}

impl GvizRow {
    fn cell(&self, index: usize) -> Value {
        self.c
            .get(index)
            .and_then(Option::as_ref)
            .map(|cell| cell.v.clone())
            .unwrap_or(Value::Null)
    }
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parses a gviz `setResponse(...)` payload.
///
/// Column keys are labels, falling back to column ids. When the sheet has
/// no labels at all, the first data row is used as the header.
pub fn parse_gviz(body: &str) -> Result<Vec<RawRow>> {
    let start = body
        .find(GVIZ_CALLBACK)
        .map(|i| i + GVIZ_CALLBACK.len())
        .context("gviz payload has no setResponse call")?;
    let end = body.rfind(')').filter(|end| *end >= start).context("gviz payload is not closed")?;

    let response: GvizResponse =
        serde_json::from_str(&body[start..end]).context("gviz payload is not valid JSON")?;

    if response.status.as_deref() == Some("error") {
        bail!("gviz response reported an error status");
    }

    let Some(table) = response.table else {
        return Ok(Vec::new());
    };

    let labels_blank = table.cols.iter().all(|c| c.label.trim().is_empty());
    let mut data_rows = table.rows.iter();

    let headers: Vec<String> = if labels_blank {
        match data_rows.next() {
            Some(first) => table
                .cols
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let text = header_text(&first.cell(i));
                    if text.is_empty() { col.id.clone() } else { text }
                })
                .collect(),
            None => return Ok(Vec::new()),
        }
    } else {
        table
            .cols
            .iter()
            .map(|col| {
                let label = col.label.trim();
                if label.is_empty() { col.id.clone() } else { label.to_string() }
            })
            .collect()
    };

    Ok(data_rows
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.cell(i)))
                .collect()
        })
        .collect())
}

/// Parses a CSV export: the first record is the header, values stay strings.
pub fn parse_csv_sheet(body: &str) -> Result<Vec<RawRow>> {
    let body = body.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("CSV sheet has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("malformed CSV record")?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let row: RawRow = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let field = record.get(i).unwrap_or_default();
                (header.clone(), Value::from(field))
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Detects the format and parses the body into rows.
///
/// # Errors
///
/// Returns an error when the body does not parse as the detected format.
pub fn parse_sheet(body: &str) -> Result<Vec<RawRow>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    match SheetFormat::detect(body) {
        SheetFormat::Gviz => parse_gviz(body),
        SheetFormat::Json => {
            let body = body.trim_start_matches('\u{feff}');
            serde_json::from_str(body).context("sheet body is not a JSON row array")
        }
        SheetFormat::Csv => parse_csv_sheet(body),
    }
}

/// Rewrites a Google Sheets edit/share link to its gviz JSON export.
///
/// Export links and non-Google URLs are returned unchanged.
pub fn sheet_export_url(url: &str) -> String {
    if url.contains("/gviz/") || url.contains("/export") {
        return url.to_string();
    }

    let Some(id) = SHEET_ID.captures(url).and_then(|c| c.get(1)) else {
        return url.to_string();
    };

    let gid = SHEET_GID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|g| format!("&gid={}", g.as_str()))
        .unwrap_or_default();

    format!(
        "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:json{}",
        id.as_str(),
        gid
    )
}
