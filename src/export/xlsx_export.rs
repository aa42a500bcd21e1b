use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};

use crate::error::{ReconcileError, Result};
use crate::export::{StagedFile, commit_all};
use crate::models::MergedTable;
use crate::orchestrator::summary::RunSummary;

fn header_format() -> Format {
    Format::new().set_bold().set_align(FormatAlign::Center)
}

fn row_format_even() -> Format {
    Format::new().set_background_color(Color::RGB(0xF2F2F2))
}

/// Workbook with a "Merged" sheet (same layout as the CSV) and a "Summary" sheet.
/// Reference values are numeric cells; algorithm cells stay text.
pub fn export_merged_xlsx(
    path: &Path,
    table: &MergedTable,
    summary: &RunSummary,
) -> Result<()> {
    commit_all(vec![stage_merged_xlsx(path, table, summary)?])
}

pub fn stage_merged_xlsx(
    path: &Path,
    table: &MergedTable,
    summary: &RunSummary,
) -> Result<StagedFile> {
    let staged = StagedFile::new(path)?;
    build_workbook(staged.partial(), table, summary)
        .map_err(|e| ReconcileError::output_write(path, e))?;
    Ok(staged)
}

fn build_workbook(
    path: &Path,
    table: &MergedTable,
    summary: &RunSummary,
) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Merged")?;
    write_merged_sheet(sheet, table)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary")?;
    write_summary_sheet(sheet, summary)?;

    workbook.save(path)?;
    Ok(())
}

fn write_merged_sheet(
    ws: &mut Worksheet,
    table: &MergedTable,
) -> std::result::Result<(), XlsxError> {
    let hfmt = header_format();
    for (c, h) in table.headers().iter().enumerate() {
        ws.write_string_with_format(0, c as u16, *h, &hfmt)?;
    }

    let even = row_format_even();
    let ref_col = table.algorithm_columns.len() as u16;
    for (i, record) in table.records.iter().enumerate() {
        let r = (i + 1) as u32;
        // banding spans the whole row, reference cells included
        let band = (i % 2 == 1).then_some(&even);
        for (c, cell) in record.cells.iter().enumerate() {
            match band {
                Some(fmt) => ws.write_string_with_format(r, c as u16, cell, fmt)?,
                None => ws.write_string(r, c as u16, cell)?,
            };
        }
        let values = record.reference.unwrap_or_default();
        let numbers = [
            values.objective,
            values.solution_type.map(|t| t as f64),
            values.gap,
            values.solve_time,
        ];
        for (offset, value) in numbers.into_iter().enumerate() {
            let c = ref_col + offset as u16;
            match (value, band) {
                (Some(v), Some(fmt)) => ws.write_number_with_format(r, c, v, fmt)?,
                (Some(v), None) => ws.write_number(r, c, v)?,
                (None, Some(fmt)) => ws.write_blank(r, c, fmt)?,
                (None, None) => continue,
            };
        }
    }
    Ok(())
}

fn write_summary_sheet(
    ws: &mut Worksheet,
    summary: &RunSummary,
) -> std::result::Result<(), XlsxError> {
    let hfmt = header_format();
    ws.write_string_with_format(0, 0, "Summary", &hfmt)?;
    let mut row: u32 = 2;
    for (k, v) in summary.entries() {
        ws.write_string(row, 0, &k)?;
        ws.write_string(row, 1, &v)?;
        row += 1;
    }
    ws.set_column_width(0, 36)?;
    Ok(())
}
