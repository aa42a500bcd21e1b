use std::collections::BTreeSet;
use std::fmt;

/// How many keys of each side are kept as samples.
pub const SAMPLE_SIZE: usize = 5;
const LIST_LIMIT: usize = 20;

/// Overlap and mismatch figures of one reconciliation. Computed during the
/// join and kept alongside the merged table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchDiagnostics {
    pub total_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Join keys of algorithm rows that found no reference record.
    pub unmatched_keys: BTreeSet<String>,
    /// Reference folders no algorithm row pointed at.
    pub unreferenced_reference_folders: BTreeSet<String>,
    /// Algorithm subfolders absent from the folder mapping (folder-scoped only).
    pub unmapped_subfolders: BTreeSet<String>,
    /// Reference folders that algorithm rows did point at.
    pub matching_folders: BTreeSet<String>,
    pub reference_keys: usize,
    pub collapsed_reference_records: usize,
    pub sample_algorithm_keys: Vec<String>,
    pub sample_reference_keys: Vec<String>,
}

impl MatchDiagnostics {
    pub fn match_rate(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.matched as f64 / self.total_rows as f64
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, items: &BTreeSet<String>) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    let shown: Vec<&str> = items.iter().take(LIST_LIMIT).map(String::as_str).collect();
    if items.len() > LIST_LIMIT {
        writeln!(
            f,
            "{label} ({} total, first {LIST_LIMIT}): {}",
            items.len(),
            shown.join(", ")
        )
    } else {
        writeln!(f, "{label} ({}): {}", items.len(), shown.join(", "))
    }
}

impl fmt::Display for MatchDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Algorithm rows:        {}", self.total_rows)?;
        writeln!(
            f,
            "Matched:               {} ({:.1}%)",
            self.matched,
            self.match_rate() * 100.0
        )?;
        writeln!(f, "Unmatched:             {}", self.unmatched)?;
        writeln!(
            f,
            "Reference keys:        {} ({} collapsed as naming variants)",
            self.reference_keys, self.collapsed_reference_records
        )?;
        writeln!(f, "Sample algorithm keys: {}", self.sample_algorithm_keys.join(", "))?;
        writeln!(f, "Sample reference keys: {}", self.sample_reference_keys.join(", "))?;
        write_list(f, "Matching folders", &self.matching_folders)?;
        write_list(f, "Unmapped subfolders", &self.unmapped_subfolders)?;
        write_list(
            f,
            "Reference folders never referenced",
            &self.unreferenced_reference_folders,
        )?;
        write_list(f, "Unmatched keys", &self.unmatched_keys)
    }
}
