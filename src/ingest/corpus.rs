//! Reference corpus: every best-known spreadsheet under a root, tagged with
//! its folder and reduced to one record per `(instance, folder)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{ReconcileError, Result};
use crate::ingest::reader::read_table;
use crate::models::{ReferenceColumns, ReferenceRecord, ReferenceValues};
use crate::util::numeric::{CoercionStats, DecimalSeparator, coerce_integer, coerce_number};

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    pub root: PathBuf,
    /// Extension of reference files, without the dot; matched case-insensitively.
    pub extension: String,
    pub columns: ReferenceColumns,
    pub value_decimal: DecimalSeparator,
    pub time_decimal: DecimalSeparator,
    pub delimiter: u8,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    pub records: Vec<ReferenceRecord>,
    pub files_read: usize,
    pub raw_rows: usize,
    pub duplicates_removed: usize,
    pub coercion: CoercionStats,
}

impl ReferenceCorpus {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// All files under `root` with `extension`, in lexicographic path order.
/// Office lock files (`~$name.xls`) are skipped.
pub fn discover_reference_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ReconcileError::source_format(path, e)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        let lock_file = entry.file_name().to_string_lossy().starts_with("~$");
        if ext_ok && !lock_file {
            files.push(path.to_path_buf());
        } else if lock_file {
            debug!("skipping lock file {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// The immediate parent directory name of a reference file.
pub fn source_folder(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn read_reference_file(
    path: &Path,
    opts: &CorpusOptions,
) -> Result<(Vec<ReferenceRecord>, CoercionStats)> {
    let cols = &opts.columns;
    let table = read_table(path, &cols.required(), opts.delimiter)?;
    let mut stats = CoercionStats::default();
    if table.is_empty() {
        return Ok((Vec::new(), stats));
    }
    let idx = |name: &str| table.column_index(name).unwrap_or(usize::MAX);
    let (i_inst, i_obj, i_type, i_gap, i_time) = (
        idx(&cols.instance),
        idx(&cols.objective),
        idx(&cols.solution_type),
        idx(&cols.gap),
        idx(&cols.solve_time),
    );

    let folder = source_folder(path);
    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let objective = coerce_number(table.cell(row, i_obj), opts.value_decimal);
        let solution_type = coerce_integer(table.cell(row, i_type), opts.value_decimal);
        let gap = coerce_number(table.cell(row, i_gap), opts.value_decimal);
        let solve_time = coerce_number(table.cell(row, i_time), opts.time_decimal);
        stats.record(&cols.objective, &objective);
        stats.record(&cols.solution_type, &solution_type);
        stats.record(&cols.gap, &gap);
        stats.record(&cols.solve_time, &solve_time);

        records.push(ReferenceRecord {
            raw_instance_id: table.cell(row, i_inst).to_string(),
            source_folder: folder.clone(),
            source_file: path.to_path_buf(),
            values: ReferenceValues {
                objective: objective.value(),
                solution_type: solution_type.value(),
                gap: gap.value(),
                solve_time: solve_time.value(),
            },
        });
    }
    Ok((records, stats))
}

/// Walk, read and deduplicate. Files are read in parallel but concatenated in
/// path order, so "first occurrence" is independent of scheduling.
pub fn build_reference_corpus(opts: &CorpusOptions) -> Result<ReferenceCorpus> {
    let files = discover_reference_files(&opts.root, &opts.extension)?;
    if files.is_empty() {
        return Err(ReconcileError::CorpusEmpty {
            root: opts.root.clone(),
            extension: opts.extension.clone(),
        });
    }
    info!(
        "Found {} reference file(s) under {}",
        files.len(),
        opts.root.display()
    );

    // collect every outcome so the reported failure is the first in path order
    let per_file: Vec<Result<(Vec<ReferenceRecord>, CoercionStats)>> = files
        .par_iter()
        .map(|path| read_reference_file(path, opts))
        .collect();
    let per_file = per_file.into_iter().collect::<Result<Vec<_>>>()?;

    let mut coercion = CoercionStats::default();
    let mut raw = Vec::new();
    for (records, stats) in per_file {
        raw.extend(records);
        coercion.merge(stats);
    }
    let raw_rows = raw.len();
    let records = deduplicate_best(raw);
    let duplicates_removed = raw_rows - records.len();
    info!(
        "Reference corpus: {} row(s), {} after keeping the best objective per (instance, folder)",
        raw_rows,
        records.len()
    );
    coercion.log_warnings("reference corpus");

    Ok(ReferenceCorpus {
        records,
        files_read: files.len(),
        raw_rows,
        duplicates_removed,
        coercion,
    })
}

/// True when `candidate` has a strictly lower objective than `incumbent`.
/// A present objective beats a missing one; two missing objectives tie.
pub fn is_better(candidate: Option<f64>, incumbent: Option<f64>) -> bool {
    match (candidate, incumbent) {
        (Some(c), Some(i)) => c.total_cmp(&i).is_lt(),
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Keep one record per `(raw_instance_id, source_folder)`: the lowest objective,
/// ties going to the earliest record. Survivors keep their first-seen order.
pub fn deduplicate_best(records: Vec<ReferenceRecord>) -> Vec<ReferenceRecord> {
    let mut slot_of: HashMap<(String, String), usize> = HashMap::with_capacity(records.len());
    let mut kept: Vec<ReferenceRecord> = Vec::with_capacity(records.len());
    for rec in records {
        let identity = (rec.raw_instance_id.clone(), rec.source_folder.clone());
        match slot_of.get(&identity) {
            Some(&slot) => {
                if is_better(rec.values.objective, kept[slot].values.objective) {
                    kept[slot] = rec;
                }
            }
            None => {
                slot_of.insert(identity, kept.len());
                kept.push(rec);
            }
        }
    }
    kept
}
