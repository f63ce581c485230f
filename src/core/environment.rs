// src/core/environment.rs

//! Environment variables shipped with a payload.
//!
//! The payload carries a properties file (`KEY=VALUE` or `KEY: VALUE`, `#`/`!` comments).
//! Occurrences of `$ROOT` in values are replaced by the payload root so that shipped tools
//! can locate their data files. The variables are handed to launched tools; the host
//! process environment is never modified.

use crate::constants::PAYLOAD_ROOT_PLACEHOLDER;
use crate::core::payload::PayloadError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref PROPERTY_LINE_RE: Regex =
        Regex::new(r"^\s*([^=:\s]+)\s*[=:]\s*(.*?)\s*$").expect("property regex is valid");
}

/// Variables loaded from a payload environment file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackagedEnvironment {
    vars: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl PackagedEnvironment {
    /// Replaces the current variables with those of `path`, substituting `payload_root`.
    pub fn load(&mut self, path: &Path, payload_root: &Path) -> Result<(), PayloadError> {
        let content = fs::read_to_string(path).map_err(|e| PayloadError::io(path, e))?;
        let root = payload_root.to_string_lossy();
        let mut vars = BTreeMap::new();
        for (key, value) in parse_properties(&content, path)? {
            vars.insert(key, value.replace(PAYLOAD_ROOT_PLACEHOLDER, &root));
        }
        log::debug!(
            "Loaded {} packaged environment variable(s) from {}",
            vars.len(),
            path.display()
        );
        self.vars = vars;
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Forgets every variable.
    pub fn clear(&mut self) {
        self.vars.clear();
        self.source = None;
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The file the variables came from, if any were loaded.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Parses a properties document into ordered key/value pairs. Later keys win on load.
pub fn parse_properties(
    content: &str,
    origin: &Path,
) -> Result<Vec<(String, String)>, PayloadError> {
    let mut pairs = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let captures =
            PROPERTY_LINE_RE
                .captures(line)
                .ok_or_else(|| PayloadError::MalformedEnvironment {
                    path: origin.to_path_buf(),
                    line: index + 1,
                    content: line.to_string(),
                })?;
        let field = |i| captures.get(i).map_or("", |m| m.as_str()).to_string();
        pairs.push((field(1), field(2)));
    }
    Ok(pairs)
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_properties_handles_separators_and_comments() {
        let content = "# comment\n! also comment\n\nA=1\nB : two words \n  C=\n";
        let pairs = parse_properties(content, Path::new("binaries.ini")).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two words".to_string()),
                ("C".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_properties_rejects_garbage() {
        let err = parse_properties("A=1\njust words\n", Path::new("binaries.ini")).unwrap_err();
        assert!(matches!(err, PayloadError::MalformedEnvironment { line: 2, .. }));
    }

    #[test]
    fn test_load_substitutes_root_and_clear_forgets() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("binaries.ini");
        fs::write(&file, "DATA=$ROOT/share\nPLAIN=x\n").unwrap();

        let mut env = PackagedEnvironment::default();
        env.load(&file, Path::new("/opt/payload")).unwrap();
        assert_eq!(env.get("DATA"), Some("/opt/payload/share"));
        assert_eq!(env.get("PLAIN"), Some("x"));
        assert_eq!(env.source(), Some(file.as_path()));

        env.clear();
        assert!(env.vars().is_empty());
        assert!(env.source().is_none());
    }
}
