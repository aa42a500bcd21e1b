pub mod csv_export;
pub mod xlsx_export;

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, Result};

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Both,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Both => "both",
        }
    }

    pub fn writes_xlsx(&self) -> bool {
        matches!(self, Self::Xlsx | Self::Both)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workbook path written next to the CSV output.
pub fn xlsx_path_for(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("xlsx")
}

pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Hidden sibling an output is written to before it is renamed into place.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    path.with_file_name(format!(".{name}.partial"))
}

/// An output fully written to its partial path but not yet visible under its
/// final name. Dropped without being committed, the partial file is removed.
#[derive(Debug)]
pub struct StagedFile {
    partial: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    pub(crate) fn new(target: &Path) -> Result<Self> {
        ensure_parent_dir(target).map_err(|e| ReconcileError::output_write(target, e))?;
        Ok(Self {
            partial: partial_path(target),
            target: target.to_path_buf(),
            committed: false,
        })
    }

    pub fn partial(&self) -> &Path {
        &self.partial
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn commit(&mut self) -> Result<()> {
        fs::rename(&self.partial, &self.target)
            .map_err(|e| ReconcileError::output_write(&self.target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.partial);
        }
    }
}

/// Rename every staged output into place. When one rename fails, the outputs
/// this call already renamed are removed and the rest stay unpublished.
pub fn commit_all(staged: Vec<StagedFile>) -> Result<()> {
    let mut published: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for mut file in staged {
        if let Err(e) = file.commit() {
            for path in &published {
                let _ = fs::remove_file(path);
            }
            return Err(e);
        }
        debug!("published {}", file.target().display());
        published.push(file.target.clone());
    }
    Ok(())
}
