// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration value type with type-safe conversions.
//!
//! `ConfigValue` carries the coercion primitives shared by the schema validator
//! and the migration engine: booleans, numbers, ports and URIs are all parsed
//! here so both paths agree on what a well-formed value looks like.

use crate::domain::errors::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A type-safe wrapper for configuration values.
///
/// Values are stored as strings and converted on demand.
///
/// # Examples
///
/// ```
/// use unicfg::domain::config_value::ConfigValue;
///
/// let value = ConfigValue::new("6379".to_string());
/// assert_eq!(value.as_port("REDIS_PORT").unwrap(), 6379);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigValue(String);

impl ConfigValue {
    /// Creates a new `ConfigValue` from a `String`.
    pub fn new(value: String) -> Self {
        ConfigValue(value)
    }

    /// Returns the value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the value into a `String`.
    pub fn as_string(&self) -> String {
        self.0.clone()
    }

    /// Returns `true` if the value is empty or only whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Converts the value to a boolean.
    ///
    /// Recognizes the following values (case-insensitive):
    /// - `true`: "true", "yes", "1", "on"
    /// - `false`: "false", "no", "0", "off"
    ///
    /// # Examples
    ///
    /// ```
    /// use unicfg::domain::config_value::ConfigValue;
    ///
    /// assert!(ConfigValue::from("on").as_bool("ENABLE_METRICS").unwrap());
    /// assert!(!ConfigValue::from("No").as_bool("ENABLE_METRICS").unwrap());
    /// ```
    pub fn as_bool(&self, key: &str) -> Result<bool> {
        match self.0.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => self
                .0
                .parse::<bool>()
                .map_err(|e| ConfigError::from_parse_bool_error(key.to_string(), e)),
        }
    }

    /// Converts the value to an `i64`.
    pub fn as_i64(&self, key: &str) -> Result<i64> {
        self.0
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e))
    }

    /// Converts the value to a `u64`.
    pub fn as_u64(&self, key: &str) -> Result<u64> {
        self.0
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e))
    }

    /// Converts the value to a finite `f64`.
    ///
    /// `NaN` and infinities are rejected even though Rust's float parser
    /// accepts them.
    pub fn as_f64(&self, key: &str) -> Result<f64> {
        let parsed = self
            .0
            .trim()
            .parse::<f64>()
            .map_err(|e| ConfigError::from_parse_float_error(key.to_string(), e))?;
        if parsed.is_finite() {
            Ok(parsed)
        } else {
            Err(ConfigError::TypeConversionError {
                key: key.to_string(),
                target_type: "number".to_string(),
                source: format!("'{}' is not a finite number", self.0).into(),
            })
        }
    }

    /// Converts the value to a TCP port in `1..=65535`.
    ///
    /// # Examples
    ///
    /// ```
    /// use unicfg::domain::config_value::ConfigValue;
    ///
    /// assert_eq!(ConfigValue::from("3000").as_port("GATEWAY_PORT").unwrap(), 3000);
    /// assert!(ConfigValue::from("0").as_port("GATEWAY_PORT").is_err());
    /// assert!(ConfigValue::from("70000").as_port("GATEWAY_PORT").is_err());
    /// ```
    pub fn as_port(&self, key: &str) -> Result<u16> {
        let port = self
            .0
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::TypeConversionError {
                key: key.to_string(),
                target_type: "port".to_string(),
                source: Box::new(e),
            })?;
        if port == 0 {
            return Err(ConfigError::TypeConversionError {
                key: key.to_string(),
                target_type: "port".to_string(),
                source: "port 0 is reserved".into(),
            });
        }
        Ok(port)
    }

    /// Validates the value as an absolute URI and returns it normalized.
    ///
    /// The returned string is the input with surrounding whitespace removed;
    /// the parsed form is only used for validation so connection strings keep
    /// their original spelling.
    ///
    /// # Examples
    ///
    /// ```
    /// use unicfg::domain::config_value::ConfigValue;
    ///
    /// let value = ConfigValue::from("postgres://app:pw@db:5432/chat");
    /// assert_eq!(value.as_uri("DATABASE_URL").unwrap(), "postgres://app:pw@db:5432/chat");
    /// assert!(ConfigValue::from("not a uri").as_uri("DATABASE_URL").is_err());
    /// ```
    pub fn as_uri(&self, key: &str) -> Result<String> {
        let trimmed = self.0.trim();
        url::Url::parse(trimmed).map_err(|e| ConfigError::TypeConversionError {
            key: key.to_string(),
            target_type: "uri".to_string(),
            source: Box::new(e),
        })?;
        Ok(trimmed.to_string())
    }

    /// Parses the value into any type that implements `FromStr`.
    pub fn parse<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.0
            .parse::<T>()
            .map_err(|e| ConfigError::TypeConversionError {
                key: key.to_string(),
                target_type: std::any::type_name::<T>().to_string(),
                source: Box::new(e),
            })
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue(s.to_string())
    }
}

impl From<ConfigValue> for String {
    fn from(value: ConfigValue) -> Self {
        value.0
    }
}

impl AsRef<str> for ConfigValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
