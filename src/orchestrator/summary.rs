//! Run summary written alongside the merged table.

use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::ingest::ReferenceCorpus;
use crate::matching::MatchDiagnostics;
use crate::util::numeric::CoercionStats;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reference_root: String,
    pub reference_extension: String,
    pub algorithm_table: String,
    pub output_path: String,
    pub key_strategy: String,
    pub merge_policy: String,

    pub reference_files: usize,
    pub reference_rows: usize,
    pub reference_records: usize,
    pub duplicates_removed: usize,
    pub reference_blank_cells: usize,
    pub reference_unparsable_cells: usize,
    pub algorithm_unparsable_cells: usize,

    pub algorithm_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub match_rate: f64,
    pub unmapped_subfolders: usize,
    pub unreferenced_reference_folders: usize,
    pub rows_written: usize,

    pub started_utc: DateTime<Utc>,
    pub ended_utc: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(cfg: &AppConfig, started_utc: DateTime<Utc>) -> Self {
        Self {
            reference_root: cfg.paths.reference_root.display().to_string(),
            reference_extension: cfg.paths.reference_extension.clone(),
            algorithm_table: cfg.paths.algorithm_table_path.display().to_string(),
            output_path: cfg.paths.output_path.display().to_string(),
            key_strategy: cfg.matching.key_strategy.as_str().to_string(),
            merge_policy: cfg.matching.merge_policy.label().to_string(),
            reference_files: 0,
            reference_rows: 0,
            reference_records: 0,
            duplicates_removed: 0,
            reference_blank_cells: 0,
            reference_unparsable_cells: 0,
            algorithm_unparsable_cells: 0,
            algorithm_rows: 0,
            matched: 0,
            unmatched: 0,
            match_rate: 0.0,
            unmapped_subfolders: 0,
            unreferenced_reference_folders: 0,
            rows_written: 0,
            started_utc,
            ended_utc: started_utc,
        }
    }

    pub fn with_corpus(mut self, corpus: &ReferenceCorpus) -> Self {
        self.reference_files = corpus.files_read;
        self.reference_rows = corpus.raw_rows;
        self.reference_records = corpus.len();
        self.duplicates_removed = corpus.duplicates_removed;
        self.reference_blank_cells = corpus.coercion.total_blank();
        self.reference_unparsable_cells = corpus.coercion.total_unparsable();
        self
    }

    pub fn with_algorithm_stats(mut self, stats: &CoercionStats) -> Self {
        self.algorithm_unparsable_cells = stats.total_unparsable();
        self
    }

    pub fn with_diagnostics(mut self, diag: &MatchDiagnostics, rows_written: usize) -> Self {
        self.algorithm_rows = diag.total_rows;
        self.matched = diag.matched;
        self.unmatched = diag.unmatched;
        self.match_rate = diag.match_rate();
        self.unmapped_subfolders = diag.unmapped_subfolders.len();
        self.unreferenced_reference_folders = diag.unreferenced_reference_folders.len();
        self.rows_written = rows_written;
        self
    }

    pub fn finish(mut self, ended_utc: DateTime<Utc>) -> Self {
        self.ended_utc = ended_utc;
        self
    }

    pub fn duration_secs(&self) -> f64 {
        (self.ended_utc - self.started_utc).num_milliseconds() as f64 / 1000.0
    }

    /// Ordered key/value rows shared by the CSV and XLSX summary writers.
    pub fn entries(&self) -> Vec<(String, String)> {
        let fmt_time = |dt: &DateTime<Utc>| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        // HH:MM:SS, hours may exceed 23
        let fmt_duration = |secs: f64| {
            let total = secs.max(0.0).floor() as u64;
            format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
        };
        let kv = |k: &str, v: String| (k.to_string(), v);
        vec![
            kv("Reference root", self.reference_root.clone()),
            kv("Reference extension", self.reference_extension.clone()),
            kv("Algorithm table", self.algorithm_table.clone()),
            kv("Output", self.output_path.clone()),
            kv("Key strategy", self.key_strategy.clone()),
            kv("Merge policy", self.merge_policy.clone()),
            kv("Reference files", self.reference_files.to_string()),
            kv("Reference rows", self.reference_rows.to_string()),
            kv("Reference records (deduplicated)", self.reference_records.to_string()),
            kv("Duplicates removed", self.duplicates_removed.to_string()),
            kv("Reference blank cells", self.reference_blank_cells.to_string()),
            kv("Reference unparsable cells", self.reference_unparsable_cells.to_string()),
            kv("Algorithm unparsable cells", self.algorithm_unparsable_cells.to_string()),
            kv("Algorithm rows", self.algorithm_rows.to_string()),
            kv("Matched", self.matched.to_string()),
            kv("Unmatched", self.unmatched.to_string()),
            kv("Match rate (%)", format!("{:.2}", self.match_rate * 100.0)),
            kv("Unmapped subfolders", self.unmapped_subfolders.to_string()),
            kv(
                "Reference folders never referenced",
                self.unreferenced_reference_folders.to_string(),
            ),
            kv("Rows written", self.rows_written.to_string()),
            kv("Started", fmt_time(&self.started_utc)),
            kv("Ended", fmt_time(&self.ended_utc)),
            kv("Duration", fmt_duration(self.duration_secs())),
        ]
    }
}
