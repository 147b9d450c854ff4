// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic scanner for configuration modules that read the environment.
//!
//! Legacy components often keep a config module that pulls values out of the
//! environment instead of an env file. The scanner extracts the referenced
//! names and resolves them against an environment, so those modules still
//! contribute keys to a migration. Extraction is best-effort: references built
//! dynamically are not found.

use crate::domain::config_key::is_env_name;
use crate::domain::{EnvMap, Result};
use crate::ports::ConfigParser;
use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized reference forms, each capturing the key name in group 1.
static REFERENCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // process.env.KEY
        r"process\.env\.([A-Za-z_][A-Za-z0-9_]*)",
        // process.env['KEY'] / process.env["KEY"]
        r#"process\.env\[\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]\s*\]"#,
        // ${KEY}
        r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}",
        // env::var("KEY")
        r#"env::var\(\s*"([A-Za-z_][A-Za-z0-9_]*)"\s*\)"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Extracts referenced environment keys in order of first appearance.
///
/// ```
/// use unicfg::adapters::source_ref::referenced_keys;
///
/// let keys = referenced_keys("port: process.env.CHAT_SERVICE_PORT || 3003,\nurl: `${DATABASE_URL}`");
/// assert_eq!(keys, vec!["CHAT_SERVICE_PORT", "DATABASE_URL"]);
/// ```
pub fn referenced_keys(content: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = REFERENCE_PATTERNS
        .iter()
        .flat_map(|re| {
            re.captures_iter(content)
                .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str())))
        })
        .filter(|(_, key)| is_env_name(key))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut keys: Vec<String> = Vec::new();
    for (_, key) in found {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Parser that turns a source module into a map of referenced keys.
///
/// Each key is resolved against the environment captured at construction;
/// unresolved keys map to an empty string so they still appear in the
/// unified artifact.
#[derive(Debug, Clone)]
pub struct SourceReferenceParser {
    environment: EnvMap,
}

impl SourceReferenceParser {
    /// Creates a parser resolving against the current process environment.
    pub fn from_process_env() -> Self {
        let mut vars: Vec<(String, String)> = std::env::vars().collect();
        vars.sort();
        Self {
            environment: vars.into_iter().collect(),
        }
    }

    /// Creates a parser resolving against `environment`.
    pub fn with_environment(environment: EnvMap) -> Self {
        Self { environment }
    }
}

impl Default for SourceReferenceParser {
    fn default() -> Self {
        Self::from_process_env()
    }
}

impl ConfigParser for SourceReferenceParser {
    fn parse(&self, content: &str) -> Result<EnvMap> {
        let map: EnvMap = referenced_keys(content)
            .into_iter()
            .map(|key| {
                let value = self.environment.get(&key).unwrap_or_default().to_string();
                (key, value)
            })
            .collect();
        tracing::debug!("Found {} environment references", map.len());
        Ok(map)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["js", "ts", "rs"]
    }
}
