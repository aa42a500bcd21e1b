//! Loads one table file into a [`TextTable`], every cell kept as text.
//!
//! Spreadsheets (`.xls`, `.xlsx`, `.xlsm`, `.xlsb`, `.ods`) are read from their
//! first worksheet with `calamine`; anything else is read as delimited text.
//! The first row is the header in both cases.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use csv::ReaderBuilder;
use log::{debug, warn};

use crate::error::{ReconcileError, Result};
use crate::models::TextTable;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|s| e.eq_ignore_ascii_case(s))
        })
        .unwrap_or(false)
}

/// Read `path` and check that every name in `expected_columns` is present in
/// the header. A file without any header row is an empty table; a header that
/// lacks an expected column is a [`ReconcileError::SourceFormat`].
pub fn read_table(path: &Path, expected_columns: &[&str], delimiter: u8) -> Result<TextTable> {
    let (columns, rows) = if is_spreadsheet(path) {
        read_spreadsheet(path)?
    } else {
        read_delimited(path, delimiter)?
    };

    if columns.is_empty() {
        warn!("{}: no header row, treating as an empty table", path.display());
        return Ok(TextTable {
            path: path.to_path_buf(),
            ..Default::default()
        });
    }

    let missing: Vec<&str> = expected_columns
        .iter()
        .copied()
        .filter(|want| !columns.iter().any(|c| c == want))
        .collect();
    if !missing.is_empty() {
        return Err(ReconcileError::source_format(
            path,
            format!(
                "missing column(s) {} (found: {})",
                missing.join(", "),
                columns.join(", ")
            ),
        ));
    }

    debug!("{}: {} row(s), {} column(s)", path.display(), rows.len(), columns.len());
    Ok(TextTable {
        path: path.to_path_buf(),
        columns,
        rows,
    })
}

type RawTable = (Vec<String>, Vec<Vec<String>>);

fn read_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReconcileError::source_format(path, e))?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| ReconcileError::source_format(path, e))?,
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => return Ok((Vec::new(), Vec::new())),
    };
    let body = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| !is_blank_row(row))
        .collect();
    Ok((columns, body))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| ReconcileError::source_format(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ReconcileError::source_format(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.iter().all(String::is_empty) {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconcileError::source_format(path, e))?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if !is_blank_row(&row) {
            rows.push(row);
        }
    }
    Ok((columns, rows))
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
