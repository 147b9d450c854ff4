// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration parser trait definition.
//!
//! This module defines the `ConfigParser` trait, which turns the content of a
//! configuration artifact into an ordered key/value map.

use crate::domain::{EnvMap, Result};

/// A trait for parsing configuration artifacts.
///
/// Parsers produce an [`EnvMap`] so that the order keys appear in the artifact
/// is preserved through merging and generation.
///
/// # Examples
///
/// ```rust
/// use unicfg::ports::ConfigParser;
/// use unicfg::domain::{EnvMap, Result};
///
/// struct Colon;
///
/// impl ConfigParser for Colon {
///     fn parse(&self, content: &str) -> Result<EnvMap> {
///         Ok(content
///             .lines()
///             .filter_map(|l| l.split_once(':'))
///             .map(|(k, v)| (k.trim(), v.trim()))
///             .collect())
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["colon"]
///     }
/// }
///
/// let parsed = Colon.parse("A: 1\nB: 2").unwrap();
/// assert_eq!(parsed.get("B"), Some("2"));
/// ```
pub trait ConfigParser {
    /// Parses artifact content into an ordered map.
    fn parse(&self, content: &str) -> Result<EnvMap>;

    /// Returns the file extensions (without the leading dot) this parser handles.
    fn supported_extensions(&self) -> &[&str];
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedParser;

    impl ConfigParser for FixedParser {
        fn parse(&self, _content: &str) -> Result<EnvMap> {
            let mut map = EnvMap::new();
            map.insert("SECOND", "2");
            map.insert("FIRST", "1");
            Ok(map)
        }

        fn supported_extensions(&self) -> &[&str] {
            &["env", "fixed"]
        }
    }

    #[test]
    fn test_parser_preserves_order() {
        let parsed = FixedParser.parse("").unwrap();
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["SECOND", "FIRST"]);
    }

    #[test]
    fn test_parser_supported_extensions() {
        assert_eq!(FixedParser.supported_extensions(), &["env", "fixed"]);
    }
}
