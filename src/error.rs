use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Fatal conditions of a reconciliation run. Cell-level parse failures are not
/// represented here; they degrade to missing values and are only counted.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("malformed source table {}: {reason}", path.display())]
    SourceFormat { path: PathBuf, reason: String },
    #[error("no reference files with extension '{extension}' under {}", root.display())]
    CorpusEmpty { root: PathBuf, extension: String },
    #[error(
        "join key '{key}' matches {} reference records: {}",
        candidates.len(),
        candidates.join("; ")
    )]
    AmbiguousMatch { key: String, candidates: Vec<String> },
    #[error(
        "duplicate algorithm filename '{filename}' in {} (rows {first_row} and {second_row})",
        path.display()
    )]
    DuplicateAlgorithmRecord {
        path: PathBuf,
        filename: String,
        first_row: usize,
        second_row: usize,
    },
    #[error("cannot write output {}: {reason}", path.display())]
    OutputWrite { path: PathBuf, reason: String },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ReconcileError {
    pub(crate) fn source_format(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn output_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::OutputWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
