use std::fs;
use std::path::{Path, PathBuf};

use instance_reconciler::config::{AppConfig, KeyStrategyKind};
use instance_reconciler::error::ReconcileError;
use instance_reconciler::export::ExportFormat;
use instance_reconciler::matching::MergePolicy;
use instance_reconciler::orchestrator;

const REFERENCE_HEADER: &str = "Instance,Objective,Type,Gap,Time\n";

fn write(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

/// Reference CSVs under `root/<folder>/best.csv` plus an algorithm table.
fn fixture(dir: &Path, references: &[(&str, &str)], algorithm: &str) -> AppConfig {
    let root = dir.join("BestKnown");
    for (folder, rows) in references {
        write(
            &root.join(folder).join("best.csv"),
            &format!("{REFERENCE_HEADER}{rows}"),
        );
    }
    let algorithm_path = dir.join("RCmax_summary.csv");
    write(&algorithm_path, algorithm);

    let mut cfg = AppConfig::default();
    cfg.paths.reference_root = root;
    cfg.paths.reference_extension = "csv".into();
    cfg.paths.algorithm_table_path = algorithm_path;
    cfg.paths.output_path = dir.join("out").join("merged.csv");
    cfg
}

fn read_lines(path: &PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn naming_drift_keeps_best_objective() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = fixture(
        dir.path(),
        &[("Family", "A-10.txt,100,1,0,3\n")],
        "filename,subfolder,Cmax\na-10.txt,Family,95\n",
    );
    write(
        &cfg.paths.reference_root.join("Family").join("cplex.csv"),
        &format!("{REFERENCE_HEADER}A-10CPLEX.txt,90,1,0,2\n"),
    );
    let outcome = orchestrator::run(&cfg).unwrap();
    assert_eq!(outcome.rows_written, 1);
    assert_eq!(outcome.diagnostics.matched, 1);
    assert_eq!(outcome.summary.reference_files, 2);
    assert_eq!(
        read_lines(&cfg.paths.output_path),
        [
            "filename,subfolder,Cmax,best_objective,best_type,best_gap,best_time",
            "a-10.txt,Family,95,90,1,0,2",
        ]
    );
}

#[test]
fn unmatched_rows_follow_merge_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = fixture(
        dir.path(),
        &[("Family", "A-10.txt,100,1,0,\"1,5\"\n")],
        "filename,subfolder,Cmax\nA-10.txt,Family,95\nmissing.txt,Family,7\n",
    );

    let outcome = orchestrator::run(&cfg).unwrap();
    assert_eq!(outcome.rows_written, 2);
    assert_eq!(outcome.diagnostics.unmatched, 1);
    assert_eq!(
        read_lines(&cfg.paths.output_path)[1..],
        ["A-10.txt,Family,95,100,1,0,1.5", "missing.txt,Family,7,,,,"]
    );

    cfg.matching.merge_policy = MergePolicy::MatchedOnly;
    let outcome = orchestrator::run(&cfg).unwrap();
    assert_eq!(outcome.rows_written, 1);
    assert_eq!(read_lines(&cfg.paths.output_path).len(), 2);
}

#[test]
fn folder_scoped_uses_mapping_and_reports_unmapped() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = fixture(
        dir.path(),
        &[
            ("TXT Cplex 2 horas log Jobs Corre", "i1.txt,10,1,0,1\n"),
            ("TXT Cplex 2 horas log Maq Corre", "i1.txt,20,1,0,1\n"),
        ],
        "filename,subfolder\ni1.txt,MaqCorre\ni2.txt,Unknown\n",
    );
    cfg.matching.key_strategy = KeyStrategyKind::FolderScoped;
    cfg.matching
        .folder_mapping
        .insert("MaqCorre".into(), "TXT Cplex 2 horas log Maq Corre".into());
    cfg.matching
        .folder_mapping
        .insert("JobsCorre".into(), "TXT Cplex 2 horas log Jobs Corre".into());

    let outcome = orchestrator::run(&cfg).unwrap();
    let d = &outcome.diagnostics;
    assert_eq!(d.matched, 1);
    assert!(d.unmapped_subfolders.contains("Unknown"));
    assert!(
        d.unreferenced_reference_folders
            .contains("TXT Cplex 2 horas log Jobs Corre")
    );
    assert_eq!(
        read_lines(&cfg.paths.output_path)[1],
        "i1.txt,MaqCorre,20,1,0,1"
    );
}

#[test]
fn same_name_in_two_folders_is_ambiguous_under_global_keys() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = fixture(
        dir.path(),
        &[("Jobs", "i1.txt,10,1,0,1\n"), ("Maq", "i1.txt,20,1,0,1\n")],
        "filename,subfolder\ni1.txt,x\n",
    );
    let err = orchestrator::run(&cfg).unwrap_err();
    assert!(matches!(err, ReconcileError::AmbiguousMatch { .. }), "{err}");
    assert!(!cfg.paths.output_path.exists());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = fixture(
        dir.path(),
        &[
            ("B", "x2.txt,5,1,0.1,7\nx1.txt,4,2,0,8\n"),
            ("A", "x3CPLEX.txt,3,1,0,9\n"),
        ],
        "filename,subfolder,Cmax\nx1.txt,s,1\nx3.txt,s,2\nx2.txt,s,3\nnone.txt,s,4\n",
    );
    orchestrator::run(&cfg).unwrap();
    let first = fs::read(&cfg.paths.output_path).unwrap();
    cfg.paths.output_path = dir.path().join("second.csv");
    orchestrator::run(&cfg).unwrap();
    assert_eq!(first, fs::read(&cfg.paths.output_path).unwrap());
}

#[test]
fn empty_corpus_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = fixture(dir.path(), &[], "filename,subfolder\na.txt,s\n");
    let err = orchestrator::run(&cfg).unwrap_err();
    assert!(matches!(err, ReconcileError::CorpusEmpty { .. }), "{err}");
}

#[test]
fn missing_reference_column_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("BestKnown").join("F");
    write(&root.join("bad.csv"), "Instance,Objective\na.txt,1\n");
    let mut cfg = fixture(dir.path(), &[], "filename,subfolder\na.txt,s\n");
    cfg.paths.reference_root = dir.path().join("BestKnown");
    match orchestrator::run(&cfg).unwrap_err() {
        ReconcileError::SourceFormat { path, reason } => {
            assert!(path.ends_with("bad.csv"));
            assert!(reason.contains("Type"), "{reason}");
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn xlsx_reference_and_workbook_export() {
    use rust_xlsxwriter::Workbook;

    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().join("BestKnown").join("Family");
    fs::create_dir_all(&folder).unwrap();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, h) in ["Instance", "Objective", "Type", "Gap", "Time"].iter().enumerate() {
        sheet.write_string(0, c as u16, *h).unwrap();
    }
    sheet.write_string(1, 0, "A-10CPLEX.txt").unwrap();
    sheet.write_number(1, 1, 90.0).unwrap();
    sheet.write_number(1, 2, 1.0).unwrap();
    sheet.write_number(1, 3, 0.25).unwrap();
    sheet.write_string(1, 4, "12,5").unwrap();
    workbook.save(folder.join("best.xlsx")).unwrap();

    let mut cfg = fixture(dir.path(), &[], "filename,subfolder\na-10.txt,Family\n");
    cfg.paths.reference_extension = "xlsx".into();
    cfg.paths.summary_path = Some(dir.path().join("out").join("summary.csv"));
    cfg.export.format = ExportFormat::Both;

    let outcome = orchestrator::run(&cfg).unwrap();
    assert_eq!(outcome.diagnostics.matched, 1);
    assert_eq!(
        read_lines(&cfg.paths.output_path)[1],
        "a-10.txt,Family,90,1,0.25,12.5"
    );
    assert!(dir.path().join("out").join("merged.xlsx").exists());
    let summary = fs::read_to_string(cfg.paths.summary_path.as_ref().unwrap()).unwrap();
    assert!(summary.starts_with("Metric,Value\n"));
    assert!(summary.contains("Matched,1\n"));
}

#[test]
fn failed_workbook_export_leaves_no_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = fixture(
        dir.path(),
        &[("Family", "A-10.txt,100,1,0,3\n")],
        "filename,subfolder\na-10.txt,Family\n",
    );
    cfg.export.format = ExportFormat::Both;
    cfg.paths.summary_path = Some(dir.path().join("out").join("summary.csv"));
    // a directory occupies the workbook name
    fs::create_dir_all(dir.path().join("out").join("merged.xlsx").join("taken")).unwrap();

    let err = orchestrator::run(&cfg).unwrap_err();
    assert!(matches!(err, ReconcileError::OutputWrite { .. }), "{err}");
    assert!(!cfg.paths.output_path.exists());
    assert!(!cfg.paths.summary_path.as_ref().unwrap().exists());
    let leftovers: Vec<_> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, ["merged.xlsx"]);
}

#[test]
fn blank_algorithm_filenames_are_kept_unmatched() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = fixture(
        dir.path(),
        &[("F", "a.txt,1,1,0,1\n")],
        "filename,subfolder,Cmax\n,F,1\n,F,2\na.txt,F,3\n",
    );
    let outcome = orchestrator::run(&cfg).unwrap();
    assert_eq!(outcome.rows_written, 3);
    assert_eq!(outcome.diagnostics.unmatched, 2);
    assert!(outcome.diagnostics.unmatched_keys.is_empty());
}
