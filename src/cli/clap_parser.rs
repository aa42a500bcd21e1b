use std::path::PathBuf;

use clap::Parser;

use crate::config::{AppConfig, KeyStrategyKind};
use crate::error::ConfigError;
use crate::export::ExportFormat;
use crate::matching::MergePolicy;

#[derive(Parser, Debug, Default)]
#[command(
    name = "instance_reconciler",
    version,
    about = "Join best-known reference results onto an algorithm summary table",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// TOML configuration file (env: RECONCILE_CONFIG)
    #[arg(long, value_name = "FILE", env = "RECONCILE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Root directory of the best-known reference files
    #[arg(long, value_name = "DIR", env = "RECONCILE_REFERENCE_ROOT")]
    pub reference_root: Option<PathBuf>,
    /// Reference file extension, e.g. xls or csv
    #[arg(long, value_name = "EXT", env = "RECONCILE_REFERENCE_EXTENSION")]
    pub reference_extension: Option<String>,
    /// Algorithm summary table (CSV or spreadsheet)
    #[arg(long, value_name = "FILE", env = "RECONCILE_ALGORITHM_TABLE")]
    pub algorithm_table: Option<PathBuf>,
    /// Merged CSV output path
    #[arg(short, long, value_name = "FILE", env = "RECONCILE_OUTPUT")]
    pub output: Option<PathBuf>,
    /// Also write a key/value run summary CSV here
    #[arg(long, value_name = "FILE", env = "RECONCILE_SUMMARY")]
    pub summary: Option<PathBuf>,
    #[arg(long, value_enum, env = "RECONCILE_KEY_STRATEGY")]
    pub key_strategy: Option<KeyStrategyKind>,
    #[arg(long, value_enum, env = "RECONCILE_MERGE_POLICY")]
    pub merge_policy: Option<MergePolicy>,
    /// Map an algorithm subfolder to a reference folder; repeatable
    #[arg(long = "map", value_name = "SUBFOLDER=FOLDER", value_parser = parse_folder_mapping)]
    pub folder_mapping: Vec<(String, String)>,
    /// Tool-suffix token stripped from instance names; repeatable, replaces the configured list
    #[arg(
        long = "tool-token",
        value_name = "TOKEN",
        env = "RECONCILE_TOOL_TOKENS",
        value_delimiter = ','
    )]
    pub tool_tokens: Vec<String>,
    #[arg(long, value_enum, env = "RECONCILE_FORMAT")]
    pub format: Option<ExportFormat>,
    /// Write a commented configuration template to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_config_template: Option<PathBuf>,
}

pub fn parse_folder_mapping(s: &str) -> Result<(String, String), String> {
    let (sub, folder) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SUBFOLDER=FOLDER, got {s:?}"))?;
    let (sub, folder) = (sub.trim(), folder.trim());
    if sub.is_empty() || folder.is_empty() {
        return Err(format!("empty side in mapping {s:?}"));
    }
    Ok((sub.to_string(), folder.to_string()))
}

impl Cli {
    /// Layer flags over the config file (or defaults) and validate.
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(p) = &self.reference_root {
            cfg.paths.reference_root = p.clone();
        }
        if let Some(ext) = &self.reference_extension {
            cfg.paths.reference_extension = ext.clone();
        }
        if let Some(p) = &self.algorithm_table {
            cfg.paths.algorithm_table_path = p.clone();
        }
        if let Some(p) = &self.output {
            cfg.paths.output_path = p.clone();
        }
        if let Some(p) = &self.summary {
            cfg.paths.summary_path = Some(p.clone());
        }
        if let Some(k) = self.key_strategy {
            cfg.matching.key_strategy = k;
        }
        if let Some(p) = self.merge_policy {
            cfg.matching.merge_policy = p;
        }
        for (sub, folder) in &self.folder_mapping {
            cfg.matching
                .folder_mapping
                .insert(sub.clone(), folder.clone());
        }
        if !self.tool_tokens.is_empty() {
            cfg.keys.tool_tokens = self.tool_tokens.clone();
        }
        if let Some(f) = self.format {
            cfg.export.format = f;
        }
    }
}
