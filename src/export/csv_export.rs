use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::{ReconcileError, Result};
use crate::export::{StagedFile, commit_all};
use crate::models::{MergedRecord, MergedTable};
use crate::orchestrator::summary::RunSummary;
use crate::util::numeric::format_number;

/// Write the merged table as UTF-8 CSV. The rows go to a sibling temporary
/// file that is renamed over `path` only once fully flushed.
pub fn export_merged_csv(path: &Path, table: &MergedTable) -> Result<()> {
    commit_all(vec![stage_merged_csv(path, table)?])
}

pub fn stage_merged_csv(path: &Path, table: &MergedTable) -> Result<StagedFile> {
    stage(path, |w| write_merged(w, table))
}

/// Header row, then one row per record. Missing reference values are empty
/// fields; numbers use the shortest round-trip representation.
pub fn write_merged<W: Write>(out: W, table: &MergedTable) -> csv::Result<()> {
    let mut w = WriterBuilder::new().from_writer(out);
    w.write_record(table.headers())?;
    for record in &table.records {
        write_record(&mut w, record)?;
    }
    w.flush()?;
    Ok(())
}

fn write_record<W: Write>(w: &mut Writer<W>, record: &MergedRecord) -> csv::Result<()> {
    let values = record.reference.unwrap_or_default();
    let objective = values.objective.map(format_number).unwrap_or_default();
    let solution_type = values
        .solution_type
        .map(|t| t.to_string())
        .unwrap_or_default();
    let gap = values.gap.map(format_number).unwrap_or_default();
    let solve_time = values.solve_time.map(format_number).unwrap_or_default();

    let mut row: Vec<&str> = record.cells.iter().map(String::as_str).collect();
    row.extend([
        objective.as_str(),
        solution_type.as_str(),
        gap.as_str(),
        solve_time.as_str(),
    ]);
    w.write_record(&row)
}

/// Two-column key/value table of the run summary.
pub fn export_summary_csv(path: &Path, summary: &RunSummary) -> Result<()> {
    commit_all(vec![stage_summary_csv(path, summary)?])
}

pub fn stage_summary_csv(path: &Path, summary: &RunSummary) -> Result<StagedFile> {
    stage(path, |out| {
        let mut w = WriterBuilder::new().from_writer(out);
        w.write_record(["Metric", "Value"])?;
        for (k, v) in summary.entries() {
            w.write_record([k.as_str(), v.as_str()])?;
        }
        w.flush()?;
        Ok(())
    })
}

/// Write to the partial path of `path`; nothing appears under `path` until the
/// returned file is committed.
fn stage<F>(path: &Path, body: F) -> Result<StagedFile>
where
    F: FnOnce(&mut BufWriter<File>) -> csv::Result<()>,
{
    let staged = StagedFile::new(path)?;
    File::create(staged.partial())
        .map_err(csv::Error::from)
        .and_then(|file| {
            let mut buf = BufWriter::with_capacity(512 * 1024, file);
            body(&mut buf)?;
            buf.flush()?;
            Ok(())
        })
        .map_err(|e| ReconcileError::output_write(path, e))?;
    Ok(staged)
}
