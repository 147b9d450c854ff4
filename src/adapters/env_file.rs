// SPDX-License-Identifier: MIT OR Apache-2.0

//! Env-style file configuration source adapter.
//!
//! This module provides the parser for `KEY=VALUE` files, a source adapter
//! reading one such file, and [`set_key`], which edits a single key in place.

use crate::domain::config_key::is_env_name;
use crate::domain::{ConfigError, ConfigKey, ConfigValue, EnvMap, Result};
use crate::ports::{ConfigParser, ConfigSource};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum allowed size for env-style files (10MB).
const MAX_ENV_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Parser for env-style files.
///
/// Rules:
/// - one `KEY=VALUE` pair per line, split on the first `=`;
/// - blank lines and lines starting with `#` are ignored;
/// - an optional leading `export ` is ignored;
/// - a value wrapped in matching `'` or `"` quotes is unwrapped;
/// - a repeated key keeps the last value.
///
/// Any other line is a [`ConfigError::ParseError`] naming the line number.
///
/// # Examples
///
/// ```rust
/// use unicfg::adapters::EnvFileParser;
/// use unicfg::ports::ConfigParser;
///
/// let parsed = EnvFileParser::new()
///     .parse("# cache\nexport REDIS_HOST=cache\nCORS_ORIGIN=\"http://a, http://b\"\n")
///     .unwrap();
/// assert_eq!(parsed.get("REDIS_HOST"), Some("cache"));
/// assert_eq!(parsed.get("CORS_ORIGIN"), Some("http://a, http://b"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EnvFileParser;

impl EnvFileParser {
    /// Creates a new env-style parser.
    pub fn new() -> Self {
        EnvFileParser
    }

    /// Parses a single non-blank, non-comment line.
    fn parse_line(line: &str, line_no: usize) -> Result<(String, String)> {
        let body = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

        let (key, value) = body.split_once('=').ok_or_else(|| ConfigError::ParseError {
            message: format!("line {}: expected KEY=VALUE", line_no),
            source: None,
        })?;

        let key = key.trim();
        if !is_env_name(key) {
            return Err(ConfigError::ParseError {
                message: format!("line {}: invalid key '{}'", line_no, key),
                source: None,
            });
        }

        Ok((key.to_string(), unquote(value.trim()).to_string()))
    }
}

/// Strips one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Quotes a value when writing it back would otherwise change its meaning.
pub(crate) fn quote(value: &str) -> String {
    let needs_quotes = value != value.trim()
        || value.contains('#')
        || (value.len() >= 2 && unquote(value).len() != value.len());
    if needs_quotes {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

impl ConfigParser for EnvFileParser {
    fn parse(&self, content: &str) -> Result<EnvMap> {
        let mut map = EnvMap::new();
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = Self::parse_line(trimmed, index + 1)?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["env"]
    }
}

/// Reads an env-style file after checking its size.
fn read_env_file(path: &Path) -> Result<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string();

    let metadata = fs::metadata(path).map_err(|e| ConfigError::SourceError {
        source_name: "env-file".to_string(),
        message: format!("Failed to read file metadata: {}", file_name),
        source: Some(Box::new(e)),
    })?;

    if metadata.len() > MAX_ENV_FILE_SIZE {
        return Err(ConfigError::SourceError {
            source_name: "env-file".to_string(),
            message: format!(
                "Configuration file too large: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_ENV_FILE_SIZE
            ),
            source: None,
        });
    }

    fs::read_to_string(path).map_err(|e| ConfigError::SourceError {
        source_name: "env-file".to_string(),
        message: format!("Failed to read configuration file: {}", file_name),
        source: Some(Box::new(e)),
    })
}

/// Configuration source adapter for an env-style file.
///
/// # Priority
///
/// Env files have a priority of 1 and are overridden by process environment
/// variables (priority 2).
///
/// The file is the adapter's [`watch_path`](ConfigSource::watch_path), so the
/// authority polls it for changes in the development tier.
///
/// # Examples
///
/// ```rust,no_run
/// use unicfg::adapters::EnvFileAdapter;
///
/// let adapter = EnvFileAdapter::from_file("/srv/chat/.env").unwrap();
/// let adapter = EnvFileAdapter::from_default_location("unicfg", "org.chat").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct EnvFileAdapter {
    /// Path to the env file
    file_path: PathBuf,
    /// Parsed configuration values
    values: EnvMap,
    /// Env-style parser
    parser: EnvFileParser,
}

impl EnvFileAdapter {
    /// Creates an adapter for the file at `path`.
    ///
    /// The file must exist and parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let parser = EnvFileParser::new();

        let canonical_path = file_path.canonicalize().map_err(|e| ConfigError::SourceError {
            source_name: "env-file".to_string(),
            message: format!("Invalid or inaccessible path: {}", file_path.display()),
            source: Some(Box::new(e)),
        })?;

        let values = parser.parse(&read_env_file(&canonical_path)?)?;
        tracing::debug!(
            "Loaded {} keys from {}",
            values.len(),
            canonical_path.display()
        );

        Ok(Self {
            file_path: canonical_path,
            values,
            parser,
        })
    }

    /// Creates an adapter for `.env` in the OS-appropriate config directory.
    ///
    /// Uses `directories::ProjectDirs`, so on Linux this resolves to
    /// `$XDG_CONFIG_HOME/<app_name>/.env`.
    pub fn from_default_location(app_name: &str, qualifier: &str) -> Result<Self> {
        Self::from_default_location_with_name(app_name, qualifier, ".env")
    }

    /// Like [`from_default_location`](Self::from_default_location) with a custom file name.
    pub fn from_default_location_with_name(
        app_name: &str,
        qualifier: &str,
        filename: &str,
    ) -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| ConfigError::SourceError {
                source_name: "env-file".to_string(),
                message: "Failed to determine project directories".to_string(),
                source: None,
            })?;

        Self::from_file(proj_dirs.config_dir().join(filename))
    }

    /// Returns the path of the backing file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl ConfigSource for EnvFileAdapter {
    fn name(&self) -> &str {
        "env-file"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn get(&self, key: &ConfigKey) -> Result<Option<ConfigValue>> {
        Ok(self.values.get(key.as_str()).map(ConfigValue::from))
    }

    fn all_keys(&self) -> Result<Vec<ConfigKey>> {
        Ok(self.values.keys().map(ConfigKey::from).collect())
    }

    fn entries(&self) -> Result<EnvMap> {
        Ok(self.values.clone())
    }

    fn reload(&mut self) -> Result<()> {
        let content = read_env_file(&self.file_path)?;
        self.values = self.parser.parse(&content)?;
        tracing::debug!(
            "Reloaded {} keys from {}",
            self.values.len(),
            self.file_path.display()
        );
        Ok(())
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.file_path)
    }
}

/// What [`set_key`] did to the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key was appended
    Added,
    /// An existing line was rewritten
    Updated,
    /// The key already had this value
    Unchanged,
}

/// Sets `key` to `value` in the env-style file at `path`.
///
/// The first `KEY=` line is rewritten in place and later duplicates are
/// dropped; comments and layout are kept. A missing key is appended, and a
/// missing file is created. The file is replaced atomically.
pub fn set_key(path: impl AsRef<Path>, key: &str, value: &str) -> Result<SetOutcome> {
    let path = path.as_ref();
    if !is_env_name(key) {
        return Err(ConfigError::ParseError {
            message: format!("invalid key '{}'", key),
            source: None,
        });
    }

    let content = if path.exists() {
        read_env_file(path)?
    } else {
        String::new()
    };

    let parser = EnvFileParser::new();
    let current = parser.parse(&content)?;
    if current.get(key) == Some(value) {
        return Ok(SetOutcome::Unchanged);
    }

    let new_line = format!("{}={}", key, quote(value));
    let mut lines = Vec::new();
    let mut replaced = false;
    for line in content.lines() {
        let trimmed = line.trim();
        let is_target = !trimmed.starts_with('#')
            && EnvFileParser::parse_line(trimmed, 0)
                .map(|(k, _)| k == key)
                .unwrap_or(false);
        if is_target {
            if !replaced {
                lines.push(new_line.clone());
                replaced = true;
            }
        } else {
            lines.push(line.to_string());
        }
    }
    if !replaced {
        lines.push(new_line);
    }

    let mut output = lines.join("\n");
    output.push('\n');
    write_atomic(path, &output)?;

    tracing::info!("Set {} in {}", key, path.display());
    Ok(if replaced {
        SetOutcome::Updated
    } else {
        SetOutcome::Added
    })
}

/// Writes `content` to a temporary file beside `path`, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| ConfigError::IoError(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_basic_pairs() {
        let parsed = EnvFileParser::new()
            .parse("APP_ENV=test\nLOG_LEVEL=debug\n")
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("APP_ENV"), Some("test"));
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let parsed = EnvFileParser::new()
            .parse("# header\n\n   \n  # indented comment\nA=1\n")
            .unwrap();
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_parse_strips_matching_quotes_only() {
        let parsed = EnvFileParser::new()
            .parse("A=\"double\"\nB='single'\nC=\"mismatched'\nD=\"\"\n")
            .unwrap();
        assert_eq!(parsed.get("A"), Some("double"));
        assert_eq!(parsed.get("B"), Some("single"));
        assert_eq!(parsed.get("C"), Some("\"mismatched'"));
        assert_eq!(parsed.get("D"), Some(""));
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let parsed = EnvFileParser::new()
            .parse("DATABASE_URL=postgres://u:p@h/db?sslmode=require\n")
            .unwrap();
        assert_eq!(
            parsed.get("DATABASE_URL"),
            Some("postgres://u:p@h/db?sslmode=require")
        );
    }

    #[test]
    fn test_parse_duplicate_key_keeps_last() {
        let parsed = EnvFileParser::new().parse("A=1\nB=2\nA=3\n").unwrap();
        assert_eq!(parsed.get("A"), Some("3"));
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_export_prefix() {
        let parsed = EnvFileParser::new().parse("export REDIS_HOST=cache\n").unwrap();
        assert_eq!(parsed.get("REDIS_HOST"), Some("cache"));
    }

    #[test]
    fn test_parse_rejects_line_without_equals() {
        let err = EnvFileParser::new().parse("A=1\nnot a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_invalid_key() {
        let err = EnvFileParser::new().parse("1BAD=x\n").unwrap_err();
        assert!(err.to_string().contains("invalid key"));
    }

    #[test]
    fn test_adapter_from_file_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "LOG_LEVEL=info\n").unwrap();

        let mut adapter = EnvFileAdapter::from_file(&path).unwrap();
        assert_eq!(adapter.name(), "env-file");
        assert_eq!(adapter.priority(), 1);
        assert_eq!(adapter.get_str("LOG_LEVEL").unwrap().unwrap().as_str(), "info");
        assert!(adapter.watch_path().is_some());

        fs::write(&path, "LOG_LEVEL=debug\n").unwrap();
        adapter.reload().unwrap();
        assert_eq!(adapter.get_str("LOG_LEVEL").unwrap().unwrap().as_str(), "debug");
    }

    #[test]
    fn test_adapter_reload_keeps_values_on_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "LOG_LEVEL=info\n").unwrap();

        let mut adapter = EnvFileAdapter::from_file(&path).unwrap();
        fs::write(&path, "garbage\n").unwrap();
        assert!(adapter.reload().is_err());
        assert_eq!(adapter.entries().unwrap().get("LOG_LEVEL"), Some("info"));
    }

    #[test]
    fn test_adapter_missing_file() {
        let result = EnvFileAdapter::from_file("/nonexistent/unicfg/.env");
        assert!(matches!(result, Err(ConfigError::SourceError { .. })));
    }

    #[test]
    fn test_set_key_updates_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# keep me\nA=1\nB=2\nA=old\n").unwrap();

        assert_eq!(set_key(&path, "A", "9").unwrap(), SetOutcome::Updated);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "# keep me\nA=9\nB=2\n");
    }

    #[test]
    fn test_set_key_appends_and_creates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(".env");

        assert_eq!(set_key(&path, "LOG_LEVEL", "warn").unwrap(), SetOutcome::Added);
        assert_eq!(set_key(&path, "LOG_LEVEL", "warn").unwrap(), SetOutcome::Unchanged);
        assert_eq!(fs::read_to_string(&path).unwrap(), "LOG_LEVEL=warn\n");
    }

    #[test]
    fn test_set_key_quotes_when_needed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");

        set_key(&path, "MAIL_FROM", "Chat #1 <noreply@chat.io>").unwrap();
        let parsed = EnvFileParser::new()
            .parse(&fs::read_to_string(&path).unwrap())
            .unwrap();
        assert_eq!(parsed.get("MAIL_FROM"), Some("Chat #1 <noreply@chat.io>"));
    }

    #[test]
    fn test_set_key_rejects_invalid_name() {
        let dir = TempDir::new().unwrap();
        assert!(set_key(dir.path().join(".env"), "bad-key", "x").is_err());
    }
}
