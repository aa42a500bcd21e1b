use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::export::ExportFormat;
use crate::ingest::{AlgorithmOptions, CorpusOptions};
use crate::matching::{KeyStrategy, MergePolicy};
use crate::models::ReferenceColumns;
use crate::normalize::{DEFAULT_CANONICAL_EXTENSION, DEFAULT_TOOL_TOKENS, KeyDeriver};
use crate::util::numeric::DecimalSeparator;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStrategyKind {
    /// Join on (canonical name, mapped reference folder)
    FolderScoped,
    /// Join on the canonical name alone
    #[default]
    Global,
}

impl KeyStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FolderScoped => "folder-scoped",
            Self::Global => "global",
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub reference_root: PathBuf,
    /// Reference file extension without the dot.
    pub reference_extension: String,
    pub algorithm_table_path: PathBuf,
    pub output_path: PathBuf,
    pub summary_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            reference_root: PathBuf::from("BestKnown"),
            reference_extension: "xls".into(),
            algorithm_table_path: PathBuf::from("RCmax_summary.csv"),
            output_path: PathBuf::from("merged_results.csv"),
            summary_path: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct MatchingConfig {
    pub key_strategy: KeyStrategyKind,
    pub merge_policy: MergePolicy,
    /// Algorithm subfolder -> reference folder; required for folder-scoped keys.
    pub folder_mapping: BTreeMap<String, String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct KeysConfig {
    pub tool_tokens: Vec<String>,
    pub canonical_extension: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            tool_tokens: DEFAULT_TOOL_TOKENS.iter().map(|t| t.to_string()).collect(),
            canonical_extension: DEFAULT_CANONICAL_EXTENSION.into(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ReferenceConfig {
    #[serde(flatten)]
    pub columns: ReferenceColumns,
    pub value_decimal: DecimalSeparator,
    /// Solve times are written with either separator depending on the machine.
    pub time_decimal: DecimalSeparator,
    /// Field delimiter when reference files are delimited text.
    pub delimiter: char,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            columns: ReferenceColumns::default(),
            value_decimal: DecimalSeparator::Dot,
            time_decimal: DecimalSeparator::Comma,
            delimiter: ',',
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub filename_column: String,
    pub subfolder_column: String,
    pub numeric_columns: Vec<String>,
    pub decimal: DecimalSeparator,
    pub delimiter: char,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            filename_column: "filename".into(),
            subfolder_column: "subfolder".into(),
            numeric_columns: Vec::new(),
            decimal: DecimalSeparator::Dot,
            delimiter: ',',
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub matching: MatchingConfig,
    pub keys: KeysConfig,
    pub reference: ReferenceConfig,
    pub algorithm: AlgorithmConfig,
    pub export: ExportConfig,
}

fn ascii_delimiter(field: &'static str, c: char) -> Result<u8, ConfigError> {
    if c.is_ascii() && c != '"' && c != '\n' && c != '\r' {
        Ok(c as u8)
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("{c:?} is not a usable single-byte delimiter"),
        })
    }
}

fn require_path(field: &'static str, p: &Path) -> Result<(), ConfigError> {
    if p.as_os_str().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    Ok(())
}

fn require_text(field: &'static str, s: &str) -> Result<(), ConfigError> {
    if s.trim().is_empty() {
        return Err(ConfigError::MissingField { field });
    }
    Ok(())
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidValue {
            field: "config",
            reason: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
            field: "config",
            reason: format!("{}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_path("paths.reference_root", &self.paths.reference_root)?;
        require_path("paths.algorithm_table_path", &self.paths.algorithm_table_path)?;
        require_path("paths.output_path", &self.paths.output_path)?;
        require_text("paths.reference_extension", &self.paths.reference_extension)?;
        if self.paths.output_path == self.paths.algorithm_table_path {
            return Err(ConfigError::InvalidValue {
                field: "paths.output_path",
                reason: "would overwrite the algorithm table".into(),
            });
        }

        if self.matching.key_strategy == KeyStrategyKind::FolderScoped
            && self.matching.folder_mapping.is_empty()
        {
            return Err(ConfigError::MissingField {
                field: "matching.folder_mapping",
            });
        }

        for token in &self.keys.tool_tokens {
            // a '.' or other separator could straddle the stem/extension boundary
            if token.is_empty() || !token.chars().all(char::is_alphanumeric) {
                return Err(ConfigError::InvalidValue {
                    field: "keys.tool_tokens",
                    reason: format!("{token:?} must be non-empty and alphanumeric"),
                });
            }
        }
        let ext = self
            .keys
            .canonical_extension
            .trim()
            .trim_start_matches('.')
            .to_lowercase();
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidValue {
                field: "keys.canonical_extension",
                reason: format!("{:?} is not a file extension", self.keys.canonical_extension),
            });
        }
        if let Some(token) = self
            .keys
            .tool_tokens
            .iter()
            .find(|t| format!(".{ext}").contains(&t.to_lowercase()))
        {
            return Err(ConfigError::InvalidValue {
                field: "keys.canonical_extension",
                reason: format!("contains tool token {token:?}"),
            });
        }

        let cols = &self.reference.columns;
        require_text("reference.instance", &cols.instance)?;
        require_text("reference.objective", &cols.objective)?;
        require_text("reference.solution_type", &cols.solution_type)?;
        require_text("reference.gap", &cols.gap)?;
        require_text("reference.solve_time", &cols.solve_time)?;
        require_text("algorithm.filename_column", &self.algorithm.filename_column)?;
        require_text("algorithm.subfolder_column", &self.algorithm.subfolder_column)?;
        ascii_delimiter("reference.delimiter", self.reference.delimiter)?;
        ascii_delimiter("algorithm.delimiter", self.algorithm.delimiter)?;
        Ok(())
    }

    pub fn key_deriver(&self) -> KeyDeriver {
        KeyDeriver::new(&self.keys.tool_tokens, &self.keys.canonical_extension)
    }

    pub fn key_strategy(&self) -> KeyStrategy {
        match self.matching.key_strategy {
            KeyStrategyKind::FolderScoped => KeyStrategy::FolderScoped {
                folder_mapping: self
                    .matching
                    .folder_mapping
                    .iter()
                    .map(|(k, v)| (k.trim().to_string(), v.clone()))
                    .collect(),
            },
            KeyStrategyKind::Global => KeyStrategy::Global,
        }
    }

    /// Call after [`AppConfig::validate`]; an invalid delimiter falls back to ','.
    pub fn corpus_options(&self) -> CorpusOptions {
        CorpusOptions {
            root: self.paths.reference_root.clone(),
            extension: self
                .paths
                .reference_extension
                .trim()
                .trim_start_matches('.')
                .to_string(),
            columns: self.reference.columns.clone(),
            value_decimal: self.reference.value_decimal,
            time_decimal: self.reference.time_decimal,
            delimiter: ascii_delimiter("reference.delimiter", self.reference.delimiter)
                .unwrap_or(b','),
        }
    }

    pub fn algorithm_options(&self) -> AlgorithmOptions {
        AlgorithmOptions {
            filename_column: self.algorithm.filename_column.clone(),
            subfolder_column: self.algorithm.subfolder_column.clone(),
            numeric_columns: self.algorithm.numeric_columns.clone(),
            decimal: self.algorithm.decimal,
            delimiter: ascii_delimiter("algorithm.delimiter", self.algorithm.delimiter)
                .unwrap_or(b','),
        }
    }
}

pub const CONFIG_TEMPLATE: &str = r#"# instance_reconciler configuration template
# Every key is optional; command-line flags and RECONCILE_* environment
# variables take precedence over this file.

[paths]
reference_root = "BestKnown"
reference_extension = "xls"
algorithm_table_path = "RCmax_summary.csv"
output_path = "merged_results.csv"
#summary_path = "merged_summary.csv"

[matching]
# folder-scoped | global
key_strategy = "folder-scoped"
# preserve-all | matched-only
merge_policy = "matched-only"

# Algorithm subfolder -> best-known reference folder
[matching.folder_mapping]
"instancias1a100" = "TXT CPLEX 2 horas de 10 a 100 log"
"instanciasde10a100" = "TXT CPLEX 2 horas de 10 a 100 log"
"instancias100a120" = "TXT Cplex 2 horas log U(100,120)"
"instancias100a200" = "TXT Cplex 2 horas log U(100,200)"
"Instanciasde1000a1100" = "TXT Cplex 2 horas U(1000,1100)"
"JobsCorre" = "TXT Cplex 2 horas log Jobs Corre"
"MaqCorre" = "TXT Cplex 2 horas log Maq Corre"

[keys]
tool_tokens = ["cplex"]
canonical_extension = ".txt"

[reference]
instance = "Instance"
objective = "Objective"
solution_type = "Type"
gap = "Gap"
solve_time = "Time"
value_decimal = "dot"
time_decimal = "comma"
delimiter = ","

[algorithm]
filename_column = "filename"
subfolder_column = "subfolder"
numeric_columns = ["n", "m", "T_star", "Cmax", "ratio"]
decimal = "dot"
delimiter = ","

[export]
# csv | xlsx | both
format = "csv"
"#;

pub fn write_config_template(path: &Path) -> std::io::Result<()> {
    fs::write(path, CONFIG_TEMPLATE)
}
