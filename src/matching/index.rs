use std::collections::BTreeMap;

use crate::error::{ReconcileError, Result};
use crate::ingest::corpus::is_better;
use crate::matching::JoinKey;
use crate::models::ReferenceRecord;

/// Reference records grouped by join key.
///
/// Records landing on the same key from the same source folder are one
/// instance spelled two ways (`A-10.txt`, `A-10CPLEX.txt`) and are collapsed
/// to the best objective, first occurrence winning ties. Records from
/// different folders stay side by side; probing such a key is ambiguous.
#[derive(Debug, Default)]
pub struct ReferenceIndex<'c> {
    entries: BTreeMap<JoinKey, Vec<&'c ReferenceRecord>>,
    collapsed: usize,
    unkeyed: usize,
}

impl<'c> ReferenceIndex<'c> {
    pub fn build<F>(records: &'c [ReferenceRecord], key_of: F) -> Self
    where
        F: Fn(&ReferenceRecord) -> Option<JoinKey>,
    {
        let mut index = Self::default();
        for rec in records {
            let Some(key) = key_of(rec) else {
                index.unkeyed += 1;
                continue;
            };
            let candidates = index.entries.entry(key).or_default();
            match candidates
                .iter_mut()
                .find(|c| c.source_folder == rec.source_folder)
            {
                Some(existing) => {
                    index.collapsed += 1;
                    if is_better(rec.values.objective, existing.values.objective) {
                        *existing = rec;
                    }
                }
                None => candidates.push(rec),
            }
        }
        index
    }

    /// Zero or one record; more than one is an [`ReconcileError::AmbiguousMatch`].
    pub fn lookup(&self, key: &JoinKey) -> Result<Option<&'c ReferenceRecord>> {
        match self.entries.get(key).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([only]) => Ok(Some(*only)),
            Some(many) => Err(ReconcileError::AmbiguousMatch {
                key: key.to_string(),
                candidates: many
                    .iter()
                    .map(|r| {
                        format!(
                            "'{}' in '{}' ({})",
                            r.raw_instance_id,
                            r.source_folder,
                            r.source_file.display()
                        )
                    })
                    .collect(),
            }),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &JoinKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records folded into another record with the same key and folder.
    pub fn collapsed(&self) -> usize {
        self.collapsed
    }

    /// Records without a usable key (blank instance id).
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceValues;
    use std::path::PathBuf;

    fn rec(id: &str, folder: &str, obj: f64) -> ReferenceRecord {
        ReferenceRecord {
            raw_instance_id: id.into(),
            source_folder: folder.into(),
            source_file: PathBuf::from(format!("{folder}/{id}.xls")),
            values: ReferenceValues {
                objective: Some(obj),
                ..Default::default()
            },
        }
    }

    fn by_lowercase(r: &ReferenceRecord) -> Option<JoinKey> {
        (!r.raw_instance_id.is_empty()).then(|| JoinKey::global(r.raw_instance_id.to_lowercase()))
    }

    #[test]
    fn same_folder_drift_collapses_to_best() {
        let records = vec![rec("A", "F", 100.0), rec("a", "F", 90.0), rec("", "F", 1.0)];
        let index = ReferenceIndex::build(&records, by_lowercase);
        assert_eq!(index.len(), 1);
        assert_eq!(index.collapsed(), 1);
        assert_eq!(index.unkeyed(), 1);
        let hit = index.lookup(&JoinKey::global("a")).unwrap().unwrap();
        assert_eq!(hit.values.objective, Some(90.0));
    }

    #[test]
    fn cross_folder_collision_is_ambiguous() {
        let records = vec![rec("a", "F1", 1.0), rec("A", "F2", 2.0)];
        let index = ReferenceIndex::build(&records, by_lowercase);
        match index.lookup(&JoinKey::global("a")) {
            Err(ReconcileError::AmbiguousMatch { key, candidates }) => {
                assert_eq!(key, "a");
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(index.lookup(&JoinKey::global("zzz")).unwrap().is_none());
    }
}
