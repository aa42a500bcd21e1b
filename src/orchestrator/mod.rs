//! End-to-end run: read both sides, reconcile, report, export.

pub mod summary;

use chrono::Utc;
use log::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::export::csv_export::{stage_merged_csv, stage_summary_csv};
use crate::export::xlsx_export::stage_merged_xlsx;
use crate::export::{commit_all, xlsx_path_for};
use crate::ingest::{build_reference_corpus, read_algorithm_table};
use crate::matching::{MatchDiagnostics, Reconciler};

pub use summary::RunSummary;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub diagnostics: MatchDiagnostics,
    pub rows_written: usize,
    pub summary: RunSummary,
}

/// Execute one reconciliation. Diagnostics are printed before any output is
/// written; any error aborts without leaving a merged file, workbook or summary.
pub fn run(cfg: &AppConfig) -> Result<RunOutcome> {
    cfg.validate()?;
    let started = Utc::now();
    let deriver = cfg.key_deriver();
    let strategy = cfg.key_strategy();
    let corpus_opts = cfg.corpus_options();
    let algo_opts = cfg.algorithm_options();

    info!(
        "Reconciling {} against {} (*.{}), strategy={}, policy={}",
        cfg.paths.algorithm_table_path.display(),
        cfg.paths.reference_root.display(),
        corpus_opts.extension,
        strategy.label(),
        cfg.matching.merge_policy.label()
    );

    let (corpus, algorithm) = rayon::join(
        || build_reference_corpus(&corpus_opts),
        || read_algorithm_table(&cfg.paths.algorithm_table_path, &algo_opts),
    );
    let corpus = corpus?;
    let (algorithm, algo_stats) = algorithm?;

    let reconciler = Reconciler::new(&deriver, &strategy, cfg.matching.merge_policy);
    let outcome = reconciler.reconcile(&algorithm, &corpus.records)?;
    let diagnostics = outcome.diagnostics;
    let merged = outcome.merged;

    println!("{diagnostics}");
    info!(
        "Matched {}/{} algorithm row(s) ({:.2}%)",
        diagnostics.matched,
        diagnostics.total_rows,
        diagnostics.match_rate() * 100.0
    );
    if !diagnostics.unmapped_subfolders.is_empty() {
        warn!(
            "{} subfolder(s) have no folder mapping: {:?}",
            diagnostics.unmapped_subfolders.len(),
            diagnostics.unmapped_subfolders
        );
    }

    let rows_written = merged.len();
    let mut summary = RunSummary::new(cfg, started)
        .with_corpus(&corpus)
        .with_algorithm_stats(&algo_stats)
        .with_diagnostics(&diagnostics, rows_written);

    // every output is staged first and published together, so a failure in
    // any of them leaves none behind
    let mut staged = vec![stage_merged_csv(&cfg.paths.output_path, &merged)?];
    summary = summary.finish(Utc::now());
    if cfg.export.format.writes_xlsx() {
        let xlsx = xlsx_path_for(&cfg.paths.output_path);
        staged.push(stage_merged_xlsx(&xlsx, &merged, &summary)?);
    }
    if let Some(path) = &cfg.paths.summary_path {
        staged.push(stage_summary_csv(path, &summary)?);
    }
    commit_all(staged)?;
    info!(
        "Wrote {} row(s) to {}",
        rows_written,
        cfg.paths.output_path.display()
    );
    if cfg.export.format.writes_xlsx() {
        info!(
            "Wrote workbook {}",
            xlsx_path_for(&cfg.paths.output_path).display()
        );
    }
    if let Some(path) = &cfg.paths.summary_path {
        info!("Wrote run summary {}", path.display());
    }

    Ok(RunOutcome {
        diagnostics,
        rows_written,
        summary,
    })
}
