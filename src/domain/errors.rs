// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration crate.
//!
//! This module defines the error types that can occur when loading, validating,
//! reloading or migrating configuration. All errors use `thiserror` for proper
//! error handling and conversion.
//!
//! Errors fall into two groups. Boot-fatal errors (schema and tier violations,
//! use before initialization, migration aborts) must stop the caller. Reload
//! failures are recoverable: the previously installed snapshot stays active.
//! [`ConfigError::is_fatal`] tells the two apart.

use crate::domain::tier::Tier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;
use std::str::ParseBoolError;
use thiserror::Error;

/// A single violated schema rule.
///
/// Validation is exhaustive, so failures carry a list of these rather than the
/// first problem encountered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// The configuration key that failed validation
    pub field: String,
    /// Human readable description of the violated rule
    pub message: String,
}

impl FieldViolation {
    /// Creates a new violation for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The main error type for configuration operations.
///
/// It is marked as `#[non_exhaustive]` to allow for future additions without
/// breaking backwards compatibility.
///
/// # Examples
///
/// ```
/// use unicfg::domain::errors::ConfigError;
///
/// fn get_config_value() -> Result<String, ConfigError> {
///     Err(ConfigError::ConfigKeyNotFound {
///         key: "cache.host".to_string(),
///     })
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The requested configuration key was not found in the snapshot.
    #[error("Configuration key not found: {key}")]
    ConfigKeyNotFound {
        /// The key that was not found
        key: String,
    },

    /// Failed to convert a configuration value to the requested type.
    #[error(
        "Failed to convert configuration value for key '{key}' to type {target_type}: {source}"
    )]
    TypeConversionError {
        /// The key being converted
        key: String,
        /// The target type name
        target_type: String,
        /// The underlying conversion error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error occurred in a configuration source.
    #[error("Configuration source '{source_name}' error: {message}")]
    SourceError {
        /// The name of the source that encountered the error
        source_name: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to parse a configuration file or value.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// The error message
        message: String,
        /// The underlying parsing error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error occurred in a configuration watcher.
    #[error("Configuration watcher error: {message}")]
    WatcherError {
        /// The error message
        message: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O error occurred while reading configuration.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The raw environment violated one or more schema rules.
    ///
    /// Contains every base violation together with any tier overlay violations.
    #[error("Configuration validation failed: {}", join_violations(.violations))]
    SchemaValidation {
        /// All violated rules
        violations: Vec<FieldViolation>,
    },

    /// The base schema passed but rules scoped to the deployment tier did not.
    #[error("Configuration is not valid for the {tier} tier: {}", join_violations(.violations))]
    TierValidation {
        /// The tier whose overlay rules failed
        tier: Tier,
        /// All violated tier rules
        violations: Vec<FieldViolation>,
    },

    /// An accessor was used before the first successful load.
    #[error("Configuration accessed before it was loaded")]
    NotInitialized,

    /// A reload attempt failed; the previous snapshot is still active.
    #[error("Configuration reload failed, keeping previous snapshot: {source}")]
    ReloadFailed {
        /// Why the new configuration was rejected
        source: Box<ConfigError>,
    },

    /// The migration run was aborted.
    #[error("Migration failed: {message}")]
    Migration {
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Legacy artifacts could not be backed up, so migration did not proceed.
    #[error("Failed to back up legacy configuration to {}: {source}", .path.display())]
    BackupFailed {
        /// The backup destination that could not be written
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// A health report could not be produced or serialized.
    #[error("Failed to generate configuration report: {message}")]
    ReportGeneration {
        /// The error message
        message: String,
    },
}

impl ConfigError {
    /// Creates a TypeConversionError from a ParseIntError.
    pub fn from_parse_int_error(key: String, err: ParseIntError) -> Self {
        ConfigError::TypeConversionError {
            key,
            target_type: "integer".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a TypeConversionError from a ParseFloatError.
    pub fn from_parse_float_error(key: String, err: ParseFloatError) -> Self {
        ConfigError::TypeConversionError {
            key,
            target_type: "float".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a TypeConversionError from a ParseBoolError.
    pub fn from_parse_bool_error(key: String, err: ParseBoolError) -> Self {
        ConfigError::TypeConversionError {
            key,
            target_type: "boolean".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a migration error with an underlying cause.
    pub fn migration(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConfigError::Migration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if the error must stop the caller.
    ///
    /// Reload failures, missing keys and conversion problems are recoverable;
    /// everything else is treated as fatal at process boot.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ConfigError::ReloadFailed { .. }
                | ConfigError::ConfigKeyNotFound { .. }
                | ConfigError::TypeConversionError { .. }
                | ConfigError::WatcherError { .. }
        )
    }

    /// Returns the field violations carried by a validation error.
    ///
    /// Reload failures are unwrapped. Other errors yield an empty slice.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ConfigError::SchemaValidation { violations }
            | ConfigError::TierValidation { violations, .. } => violations,
            ConfigError::ReloadFailed { source } => source.violations(),
            _ => &[],
        }
    }
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_key_not_found_error() {
        let error = ConfigError::ConfigKeyNotFound {
            key: "cache.host".to_string(),
        };
        assert_eq!(error.to_string(), "Configuration key not found: cache.host");
    }

    #[test]
    fn test_type_conversion_error() {
        let source_error = "invalid value".parse::<u16>().unwrap_err();
        let error = ConfigError::TypeConversionError {
            key: "REDIS_PORT".to_string(),
            target_type: "port".to_string(),
            source: Box::new(source_error),
        };
        assert!(error.to_string().contains("REDIS_PORT"));
        assert!(error.to_string().contains("port"));
    }

    #[test]
    fn test_schema_validation_lists_every_violation() {
        let error = ConfigError::SchemaValidation {
            violations: vec![
                FieldViolation::new("JWT_SECRET", "is required"),
                FieldViolation::new("DATABASE_URL", "is required"),
            ],
        };
        let text = error.to_string();
        assert!(text.contains("JWT_SECRET: is required"));
        assert!(text.contains("DATABASE_URL: is required"));
        assert_eq!(error.violations().len(), 2);
    }

    #[test]
    fn test_tier_validation_names_tier() {
        let error = ConfigError::TierValidation {
            tier: Tier::Production,
            violations: vec![FieldViolation::new("CORS_ORIGIN", "wildcard not allowed")],
        };
        assert!(error.to_string().contains("production"));
        assert!(error.to_string().contains("CORS_ORIGIN"));
    }

    #[test]
    fn test_reload_failed_is_recoverable() {
        let error = ConfigError::ReloadFailed {
            source: Box::new(ConfigError::SchemaValidation {
                violations: vec![FieldViolation::new("DATABASE_URL", "is required")],
            }),
        };
        assert!(!error.is_fatal());
        assert_eq!(error.violations()[0].field, "DATABASE_URL");
    }

    #[test]
    fn test_boot_errors_are_fatal() {
        assert!(ConfigError::NotInitialized.is_fatal());
        assert!(ConfigError::SchemaValidation { violations: vec![] }.is_fatal());
        assert!(ConfigError::BackupFailed {
            path: PathBuf::from("/tmp/backup"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .is_fatal());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = ConfigError::from(io_error);
        assert!(matches!(error, ConfigError::IoError(_)));
    }

    #[test]
    fn test_from_parse_int_error() {
        let parse_err = "not_a_number".parse::<i32>().unwrap_err();
        let error = ConfigError::from_parse_int_error("test.key".to_string(), parse_err);
        assert!(matches!(error, ConfigError::TypeConversionError { .. }));
        assert!(error.to_string().contains("integer"));
    }

    #[test]
    fn test_from_parse_bool_error() {
        let parse_err = "not_a_bool".parse::<bool>().unwrap_err();
        let error = ConfigError::from_parse_bool_error("test.key".to_string(), parse_err);
        assert!(error.to_string().contains("boolean"));
    }

    #[test]
    fn test_migration_error_keeps_source() {
        use std::error::Error as _;
        let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let error = ConfigError::migration("failed to write unified file", io_error);
        assert!(error.source().is_some());
        assert!(error.is_fatal());
    }
}
