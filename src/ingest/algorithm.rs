use std::collections::HashMap;
use std::path::Path;

use log::info;

use crate::error::{ReconcileError, Result};
use crate::ingest::reader::read_table;
use crate::models::{AlgorithmRecord, AlgorithmTable, REFERENCE_OUTPUT_COLUMNS};
use crate::util::numeric::{CoercionStats, Coerced, DecimalSeparator, coerce_number, format_number};

#[derive(Debug, Clone)]
pub struct AlgorithmOptions {
    pub filename_column: String,
    pub subfolder_column: String,
    /// Columns normalized through numeric coercion; all others pass through verbatim.
    pub numeric_columns: Vec<String>,
    pub decimal: DecimalSeparator,
    pub delimiter: u8,
}

impl Default for AlgorithmOptions {
    fn default() -> Self {
        Self {
            filename_column: "filename".into(),
            subfolder_column: "subfolder".into(),
            numeric_columns: Vec::new(),
            decimal: DecimalSeparator::Dot,
            delimiter: b',',
        }
    }
}

/// Read the algorithm summary. Filenames must be unique: the table is the
/// authority for one row per measured instance, so a repeat is an error.
pub fn read_algorithm_table(
    path: &Path,
    opts: &AlgorithmOptions,
) -> Result<(AlgorithmTable, CoercionStats)> {
    let mut expected = vec![opts.filename_column.as_str(), opts.subfolder_column.as_str()];
    expected.extend(opts.numeric_columns.iter().map(String::as_str));
    let mut table = read_table(path, &expected, opts.delimiter)?;

    if let Some(clash) = table
        .columns
        .iter()
        .find(|c| REFERENCE_OUTPUT_COLUMNS.contains(&c.as_str()))
    {
        return Err(ReconcileError::source_format(
            path,
            format!("column '{clash}' collides with a reference output column"),
        ));
    }

    let mut stats = CoercionStats::default();
    if table.columns.is_empty() {
        return Ok((
            AlgorithmTable {
                path: path.to_path_buf(),
                ..Default::default()
            },
            stats,
        ));
    }

    let numeric_idx: Vec<(usize, &str)> = opts
        .numeric_columns
        .iter()
        .filter_map(|name| table.column_index(name).map(|i| (i, name.as_str())))
        .collect();
    let i_file = table.column_index(&opts.filename_column).unwrap_or(usize::MAX);
    let i_sub = table.column_index(&opts.subfolder_column).unwrap_or(usize::MAX);

    let mut first_seen: HashMap<String, usize> = HashMap::with_capacity(table.len());
    let mut records = Vec::with_capacity(table.len());
    for (row_no, mut cells) in std::mem::take(&mut table.rows).into_iter().enumerate() {
        cells.resize(table.columns.len(), String::new());
        for &(i, name) in &numeric_idx {
            let coerced = coerce_number(&cells[i], opts.decimal);
            stats.record(name, &coerced);
            cells[i] = match coerced {
                Coerced::Value(v) => format_number(v),
                Coerced::Blank | Coerced::Unparsable => String::new(),
            };
        }
        let filename = cells[i_file].clone();
        let subfolder = cells[i_sub].clone();
        // blank filenames never join, so repeats of them are not duplicates
        if !filename.trim().is_empty() {
            if let Some(&first_row) = first_seen.get(&filename) {
                return Err(ReconcileError::DuplicateAlgorithmRecord {
                    path: path.to_path_buf(),
                    filename,
                    first_row,
                    second_row: row_no + 1,
                });
            }
            first_seen.insert(filename.clone(), row_no + 1);
        }
        records.push(AlgorithmRecord {
            filename,
            subfolder,
            cells,
        });
    }

    info!("Algorithm table {}: {} row(s)", path.display(), records.len());
    stats.log_warnings("algorithm table");
    Ok((
        AlgorithmTable {
            path: path.to_path_buf(),
            columns: table.columns,
            records,
        },
        stats,
    ))
}
