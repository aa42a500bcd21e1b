use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output headers appended after the algorithm columns, in this order.
pub const REFERENCE_OUTPUT_COLUMNS: [&str; 4] =
    ["best_objective", "best_type", "best_gap", "best_time"];

/// One physical table with every cell kept as text.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, or "" when the row is shorter than the header.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Non-key values carried from a reference record into the merged output.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReferenceValues {
    pub objective: Option<f64>,
    pub solution_type: Option<i64>,
    pub gap: Option<f64>,
    pub solve_time: Option<f64>,
}

/// Best-known solution row. Identity is `(raw_instance_id, source_folder)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRecord {
    pub raw_instance_id: String,
    pub source_folder: String,
    pub source_file: PathBuf,
    pub values: ReferenceValues,
}

impl ReferenceRecord {
    pub fn identity(&self) -> (&str, &str) {
        (&self.raw_instance_id, &self.source_folder)
    }
}

/// One measured run. `cells` holds every column of the source table verbatim
/// (after optional numeric normalization), including filename and subfolder.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmRecord {
    pub filename: String,
    pub subfolder: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AlgorithmTable {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub records: Vec<AlgorithmRecord>,
}

impl AlgorithmTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub cells: Vec<String>,
    pub reference: Option<ReferenceValues>,
}

/// Join result: algorithm columns first, then [`REFERENCE_OUTPUT_COLUMNS`].
#[derive(Debug, Clone, Default)]
pub struct MergedTable {
    pub algorithm_columns: Vec<String>,
    pub records: Vec<MergedRecord>,
}

impl MergedTable {
    pub fn headers(&self) -> Vec<&str> {
        self.algorithm_columns
            .iter()
            .map(String::as_str)
            .chain(REFERENCE_OUTPUT_COLUMNS)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// Column names of the reference spreadsheets; every file must carry all five.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceColumns {
    pub instance: String,
    pub objective: String,
    pub solution_type: String,
    pub gap: String,
    pub solve_time: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            instance: "Instance".into(),
            objective: "Objective".into(),
            solution_type: "Type".into(),
            gap: "Gap".into(),
            solve_time: "Time".into(),
        }
    }
}

impl ReferenceColumns {
    pub fn required(&self) -> [&str; 5] {
        [
            &self.instance,
            &self.objective,
            &self.solution_type,
            &self.gap,
            &self.solve_time,
        ]
    }
}
