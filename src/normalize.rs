//! Canonical join keys for instance names.
//!
//! Reference spreadsheets and the algorithm summary spell the same instance
//! differently (`A-10CPLEX.txt`, ` a-10 `, `A-10.xls`). Both sides are mapped
//! through [`KeyDeriver`] before joining. Derivation is pure and idempotent.

pub const DEFAULT_TOOL_TOKENS: &[&str] = &["cplex"];
pub const DEFAULT_CANONICAL_EXTENSION: &str = ".txt";

/// Separators left behind once a tool-suffix token has been removed.
const SUFFIX_SEPARATORS: &[char] = &['_', '-', '.'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    tool_tokens: Vec<String>,
    extension: String,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TOKENS, DEFAULT_CANONICAL_EXTENSION)
    }
}

impl KeyDeriver {
    /// Tokens are case-folded; blank tokens are ignored. The extension is
    /// lower-cased and given a leading dot when it lacks one.
    pub fn new<I, S>(tool_tokens: I, extension: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tool_tokens: Vec<String> = tool_tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        // longest first so "cplex12" is not left as "12" by an earlier "cplex"
        tool_tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tool_tokens.dedup();
        let ext = extension.trim().trim_start_matches('.').to_lowercase();
        Self {
            tool_tokens,
            extension: format!(".{ext}"),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn tool_tokens(&self) -> &[String] {
        &self.tool_tokens
    }

    /// Trim, case-fold, strip tool tokens and whitespace, force the canonical
    /// extension.
    pub fn canonical_key(&self, raw: &str) -> String {
        let mut key = raw.trim().to_lowercase();
        // Removing a token can join two fragments into a new token (or a
        // token split by spaces can close up), so iterate to a fixpoint.
        loop {
            let before = key.len();
            for token in &self.tool_tokens {
                if key.contains(token.as_str()) {
                    key = key.replace(token.as_str(), "");
                }
            }
            key.retain(|c| !c.is_whitespace());
            if key.len() == before {
                break;
            }
        }
        self.with_extension(&key)
    }

    /// Canonical key with the residue of a trailing tool suffix
    /// (`a-10_cplex` -> `a-10_`) trimmed from the stem.
    pub fn global_key(&self, raw: &str) -> String {
        let canonical = self.canonical_key(raw);
        let stem = canonical
            .strip_suffix(self.extension.as_str())
            .unwrap_or(&canonical);
        format!(
            "{}{}",
            stem.trim_end_matches(SUFFIX_SEPARATORS),
            self.extension
        )
    }

    fn with_extension(&self, key: &str) -> String {
        let stem = match key.rfind('.') {
            Some(dot) if looks_like_extension(&key[dot + 1..]) => &key[..dot],
            _ => key,
        };
        format!("{}{}", stem.trim_end_matches('.'), self.extension)
    }
}

// "txt", "xls", "dat1" are extensions; "10" in "inst.10" is part of the name.
fn looks_like_extension(candidate: &str) -> bool {
    (1..=5).contains(&candidate.len())
        && candidate.chars().all(|c| c.is_ascii_alphanumeric())
        && candidate.chars().any(|c| c.is_ascii_alphabetic())
}

/// [`KeyDeriver::canonical_key`] with the default token list and extension.
pub fn canonical_key(raw: &str) -> String {
    KeyDeriver::default().canonical_key(raw)
}
