//! Command-line surface. Flags fall back to `RECONCILE_*` environment
//! variables, then to the TOML file named by `--config`, then to defaults.

mod clap_parser;

pub use clap_parser::{Cli, parse_folder_mapping};
