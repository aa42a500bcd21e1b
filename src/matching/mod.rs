//! Join engine: attaches best-known reference values to algorithm rows.
//!
//! Keys are derived with [`KeyDeriver`] under one of two [`KeyStrategy`]
//! variants, and unmatched rows are kept or dropped per [`MergePolicy`].

pub mod diagnostics;
pub mod index;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AlgorithmTable, MergedRecord, MergedTable, ReferenceRecord};
use crate::normalize::KeyDeriver;

pub use diagnostics::{MatchDiagnostics, SAMPLE_SIZE};
pub use index::ReferenceIndex;

/// How algorithm rows and reference records are keyed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Canonical name plus the reference folder the algorithm subfolder maps
    /// to. Needed when unrelated families reuse instance names.
    FolderScoped {
        folder_mapping: BTreeMap<String, String>,
    },
    /// Canonical name with any trailing tool suffix removed; names must be
    /// unique across the whole corpus.
    Global,
}

impl KeyStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            KeyStrategy::FolderScoped { .. } => "folder-scoped",
            KeyStrategy::Global => "global",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Every algorithm row is emitted; unmatched rows carry missing reference values.
    #[default]
    PreserveAll,
    /// Algorithm rows without a reference record are dropped.
    MatchedOnly,
}

impl MergePolicy {
    pub fn label(&self) -> &'static str {
        match self {
            MergePolicy::PreserveAll => "preserve-all",
            MergePolicy::MatchedOnly => "matched-only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey {
    pub name: String,
    pub folder: Option<String>,
}

impl JoinKey {
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: None,
        }
    }

    pub fn scoped(name: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: Some(folder.into()),
        }
    }
}

impl fmt::Display for JoinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.folder {
            Some(folder) => write!(f, "{}/{}", folder, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub merged: MergedTable,
    pub diagnostics: MatchDiagnostics,
}

pub struct Reconciler<'a> {
    deriver: &'a KeyDeriver,
    strategy: &'a KeyStrategy,
    policy: MergePolicy,
}

impl<'a> Reconciler<'a> {
    pub fn new(deriver: &'a KeyDeriver, strategy: &'a KeyStrategy, policy: MergePolicy) -> Self {
        Self {
            deriver,
            strategy,
            policy,
        }
    }

    fn name_key(&self, raw: &str) -> String {
        match self.strategy {
            KeyStrategy::FolderScoped { .. } => self.deriver.canonical_key(raw),
            KeyStrategy::Global => self.deriver.global_key(raw),
        }
    }

    /// `None` for a blank instance id.
    pub fn reference_key(&self, rec: &ReferenceRecord) -> Option<JoinKey> {
        if rec.raw_instance_id.trim().is_empty() {
            return None;
        }
        let name = self.name_key(&rec.raw_instance_id);
        Some(match self.strategy {
            KeyStrategy::FolderScoped { .. } => JoinKey::scoped(name, rec.source_folder.as_str()),
            KeyStrategy::Global => JoinKey::global(name),
        })
    }

    /// Join `algorithms` against the deduplicated `corpus`, in algorithm row order.
    pub fn reconcile(
        &self,
        algorithms: &AlgorithmTable,
        corpus: &[ReferenceRecord],
    ) -> Result<Reconciliation> {
        let index = ReferenceIndex::build(corpus, |r| self.reference_key(r));
        let mut diag = MatchDiagnostics {
            total_rows: algorithms.len(),
            reference_keys: index.len(),
            collapsed_reference_records: index.collapsed(),
            sample_reference_keys: index
                .keys()
                .take(SAMPLE_SIZE)
                .map(ToString::to_string)
                .collect(),
            ..Default::default()
        };
        let reference_folders: BTreeSet<&str> =
            corpus.iter().map(|r| r.source_folder.as_str()).collect();
        let mut referenced_folders: BTreeSet<String> = BTreeSet::new();
        let mut records = Vec::with_capacity(algorithms.len());

        for rec in &algorithms.records {
            let blank = rec.filename.trim().is_empty();
            let name = self.name_key(&rec.filename);
            if !blank
                && diag.sample_algorithm_keys.len() < SAMPLE_SIZE
                && !diag.sample_algorithm_keys.contains(&name)
            {
                diag.sample_algorithm_keys.push(name.clone());
            }

            let key = match self.strategy {
                KeyStrategy::FolderScoped { folder_mapping } => {
                    match folder_mapping.get(rec.subfolder.trim()) {
                        Some(folder) => {
                            referenced_folders.insert(folder.clone());
                            Some(JoinKey::scoped(name.as_str(), folder.as_str()))
                        }
                        None => {
                            diag.unmapped_subfolders.insert(rec.subfolder.trim().to_string());
                            None
                        }
                    }
                }
                KeyStrategy::Global => Some(JoinKey::global(name.as_str())),
            };

            let hit = match &key {
                Some(k) if !blank => index.lookup(k)?,
                _ => None,
            };
            match hit {
                Some(reference) => {
                    diag.matched += 1;
                    if let KeyStrategy::Global = self.strategy {
                        referenced_folders.insert(reference.source_folder.clone());
                    }
                    records.push(MergedRecord {
                        cells: rec.cells.clone(),
                        reference: Some(reference.values),
                    });
                }
                None => {
                    diag.unmatched += 1;
                    if !blank {
                        diag.unmatched_keys
                            .insert(key.map(|k| k.to_string()).unwrap_or(name));
                    }
                    debug!("no reference record for '{}'", rec.filename);
                    if self.policy == MergePolicy::PreserveAll {
                        records.push(MergedRecord {
                            cells: rec.cells.clone(),
                            reference: None,
                        });
                    }
                }
            }
        }

        diag.matching_folders = referenced_folders
            .iter()
            .filter(|f| reference_folders.contains(f.as_str()))
            .cloned()
            .collect();
        diag.unreferenced_reference_folders = reference_folders
            .iter()
            .filter(|f| !referenced_folders.contains(**f))
            .map(|f| f.to_string())
            .collect();

        info!(
            "Reconciled {} algorithm row(s): {} matched, {} unmatched ({} strategy, {})",
            diag.total_rows,
            diag.matched,
            diag.unmatched,
            self.strategy.label(),
            self.policy.label()
        );
        Ok(Reconciliation {
            merged: MergedTable {
                algorithm_columns: algorithms.columns.clone(),
                records,
            },
            diagnostics: diag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::models::{AlgorithmRecord, ReferenceValues};
    use std::path::PathBuf;

    fn reference(id: &str, folder: &str, obj: f64) -> ReferenceRecord {
        ReferenceRecord {
            raw_instance_id: id.into(),
            source_folder: folder.into(),
            source_file: PathBuf::from(format!("BestKnown/{folder}/sheet.xls")),
            values: ReferenceValues {
                objective: Some(obj),
                solution_type: Some(1),
                gap: Some(0.0),
                solve_time: Some(12.5),
            },
        }
    }

    fn algorithms(rows: &[(&str, &str, &str)]) -> AlgorithmTable {
        AlgorithmTable {
            path: PathBuf::from("RCmax_summary.csv"),
            columns: vec!["filename".into(), "subfolder".into(), "Cmax".into()],
            records: rows
                .iter()
                .map(|(f, s, c)| AlgorithmRecord {
                    filename: f.to_string(),
                    subfolder: s.to_string(),
                    cells: vec![f.to_string(), s.to_string(), c.to_string()],
                })
                .collect(),
        }
    }

    fn mapping(pairs: &[(&str, &str)]) -> KeyStrategy {
        KeyStrategy::FolderScoped {
            folder_mapping: pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        }
    }

    #[test]
    fn global_preserve_all_keeps_every_row() {
        let deriver = KeyDeriver::default();
        let corpus = vec![reference("A-10CPLEX.txt", "F", 90.0), reference("B-3.txt", "F", 7.0)];
        let alg = algorithms(&[("a-10.txt", "x", "95"), ("zz.txt", "x", "1"), ("", "x", "2")]);
        let out = Reconciler::new(&deriver, &KeyStrategy::Global, MergePolicy::PreserveAll)
            .reconcile(&alg, &corpus)
            .unwrap();
        assert_eq!(out.merged.len(), alg.len());
        assert_eq!(out.merged.records[0].reference.unwrap().objective, Some(90.0));
        assert_eq!(out.merged.records[1].reference, None);
        assert_eq!(out.merged.records[2].reference, None);
        assert_eq!(out.merged.records[1].cells, ["zz.txt", "x", "1"]);

        let d = &out.diagnostics;
        assert_eq!((d.total_rows, d.matched, d.unmatched), (3, 1, 2));
        assert_eq!(d.unmatched_keys.iter().collect::<Vec<_>>(), ["zz.txt"]);
        assert_eq!(d.matching_folders.iter().collect::<Vec<_>>(), ["F"]);
        assert!(d.unreferenced_reference_folders.is_empty());
    }

    #[test]
    fn matched_only_drops_unmatched_rows() {
        let deriver = KeyDeriver::default();
        let corpus = vec![reference("A-10.txt", "F", 90.0)];
        let alg = algorithms(&[("a-10.txt", "x", "95"), ("zz.txt", "x", "1")]);
        let out = Reconciler::new(&deriver, &KeyStrategy::Global, MergePolicy::MatchedOnly)
            .reconcile(&alg, &corpus)
            .unwrap();
        assert_eq!(out.merged.len(), out.diagnostics.matched);
        assert_eq!(out.merged.records[0].cells[0], "a-10.txt");
        assert_eq!(out.diagnostics.unmatched, 1);
    }

    #[test]
    fn folder_scoped_separates_name_collisions() {
        let deriver = KeyDeriver::default();
        let corpus = vec![
            reference("i1.txt", "TXT Cplex 2 horas log Jobs Corre", 10.0),
            reference("i1.txt", "TXT Cplex 2 horas log Maq Corre", 20.0),
            reference("i9.txt", "TXT Cplex 2 horas U(1000,1100)", 30.0),
        ];
        let strategy = mapping(&[
            ("JobsCorre", "TXT Cplex 2 horas log Jobs Corre"),
            ("MaqCorre", "TXT Cplex 2 horas log Maq Corre"),
        ]);
        let alg = algorithms(&[
            ("I1.TXT", "JobsCorre", "11"),
            ("i1", "MaqCorre", "21"),
            ("i1.txt", "Other", "0"),
        ]);
        let out = Reconciler::new(&deriver, &strategy, MergePolicy::PreserveAll)
            .reconcile(&alg, &corpus)
            .unwrap();
        let objectives: Vec<_> = out
            .merged
            .records
            .iter()
            .map(|r| r.reference.and_then(|v| v.objective))
            .collect();
        assert_eq!(objectives, [Some(10.0), Some(20.0), None]);

        let d = &out.diagnostics;
        assert_eq!(d.unmapped_subfolders.iter().collect::<Vec<_>>(), ["Other"]);
        assert_eq!(
            d.unreferenced_reference_folders.iter().collect::<Vec<_>>(),
            ["TXT Cplex 2 horas U(1000,1100)"]
        );
        assert_eq!(d.matching_folders.len(), 2);
    }

    #[test]
    fn global_collision_across_folders_is_ambiguous() {
        let deriver = KeyDeriver::default();
        let corpus = vec![reference("i1.txt", "F1", 10.0), reference("I1CPLEX", "F2", 20.0)];
        let alg = algorithms(&[("i1.txt", "x", "1")]);
        let err = Reconciler::new(&deriver, &KeyStrategy::Global, MergePolicy::PreserveAll)
            .reconcile(&alg, &corpus)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::AmbiguousMatch { .. }));

        // the same corpus is unambiguous once keys are folder-scoped
        let strategy = mapping(&[("x", "F2")]);
        let out = Reconciler::new(&deriver, &strategy, MergePolicy::PreserveAll)
            .reconcile(&alg, &corpus)
            .unwrap();
        assert_eq!(out.merged.records[0].reference.unwrap().objective, Some(20.0));
    }

    #[test]
    fn unprobed_ambiguity_does_not_fail() {
        let deriver = KeyDeriver::default();
        let corpus = vec![reference("dup.txt", "F1", 1.0), reference("dup.txt", "F2", 2.0)];
        let alg = algorithms(&[("other.txt", "x", "1")]);
        let out = Reconciler::new(&deriver, &KeyStrategy::Global, MergePolicy::MatchedOnly)
            .reconcile(&alg, &corpus)
            .unwrap();
        assert!(out.merged.is_empty());
        assert_eq!(out.diagnostics.unreferenced_reference_folders.len(), 2);
    }

    #[test]
    fn join_key_display() {
        assert_eq!(JoinKey::scoped("a.txt", "F").to_string(), "F/a.txt");
        assert_eq!(JoinKey::global("a.txt").to_string(), "a.txt");
    }
}
