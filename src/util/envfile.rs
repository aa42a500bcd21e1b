use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Result;

/// Parse `KEY=value` lines. Blank lines and `#` comments are skipped, one
/// layer of matching quotes is removed from values.
pub fn parse_env_str(content: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (idx, line) in content.lines().enumerate() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((key, val)) = s.split_once('=') else {
            eprintln!(
                "Warning: ignoring .env line {} without '=': {}",
                idx + 1,
                line
            );
            continue;
        };
        let val = val.trim();
        let unquoted = val
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| val.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(val);
        map.insert(key.trim().to_string(), unquoted.to_string());
    }
    map
}

pub fn parse_env_file(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    Ok(parse_env_str(&fs::read_to_string(path)?))
}

/// Load `.env` from the working directory. Variables already present in the
/// environment are not overridden.
pub fn load_dotenv_if_present() -> Result<usize> {
    let mut applied = 0;
    for (k, v) in parse_env_file(Path::new(".env"))? {
        if std::env::var_os(&k).is_none() {
            // SAFETY: called from main before any other thread is spawned
            unsafe {
                std::env::set_var(&k, &v);
            }
            applied += 1;
        }
    }
    Ok(applied)
}
