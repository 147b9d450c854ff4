// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declared configuration schema.
//!
//! [`SCHEMA`] lists every key the platform consumes, with its type, whether it
//! is required, its default and its constraints. The validator walks this table;
//! the migration engine and report generator use it to recognize known keys.

use crate::domain::tier::Tier;
use serde::{Serialize, Serializer};
use std::fmt;

/// The primitive type a field is coerced into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-form text; `min`/`max` bound its length
    String,
    /// A finite number; `min`/`max` bound its value
    Number,
    /// A boolean flag
    Boolean,
    /// An absolute URI such as a connection string
    Uri,
    /// A TCP port in `1..=65535`
    Port,
}

impl FieldKind {
    /// Lowercase name used in violation messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Uri => "uri",
            FieldKind::Port => "port",
        }
    }
}

/// Whether a field must be supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// May be absent
    Optional,
    /// Must be present in every tier
    Always,
    /// Must be present only in the listed tiers
    InTiers(&'static [Tier]),
}

impl Requirement {
    /// Returns `true` if the field is required in `tier`.
    pub fn applies_to(&self, tier: Tier) -> bool {
        match self {
            Requirement::Optional => false,
            Requirement::Always => true,
            Requirement::InTiers(tiers) => tiers.contains(&tier),
        }
    }
}

/// One declared configuration field.
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    /// Environment key
    pub key: &'static str,
    /// Type the raw string is coerced into
    pub kind: FieldKind,
    /// Whether the key must be present
    pub required: Requirement,
    /// Value used when the key is absent
    pub default: Option<&'static str>,
    /// Allowed values; empty means unconstrained
    pub allowed: &'static [&'static str],
    /// Lower bound (value for numbers, length for strings)
    pub min: Option<f64>,
    /// Upper bound (value for numbers, length for strings)
    pub max: Option<f64>,
    /// Whether a number must be a whole number
    pub integer: bool,
    /// Whether the value is secret material and must be masked on display
    pub secret: bool,
}

impl FieldRule {
    const fn new(key: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            kind,
            required: Requirement::Optional,
            default: None,
            allowed: &[],
            min: None,
            max: None,
            integer: false,
            secret: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = Requirement::Always;
        self
    }

    const fn required_in(mut self, tiers: &'static [Tier]) -> Self {
        self.required = Requirement::InTiers(tiers);
        self
    }

    const fn default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.allowed = values;
        self
    }

    const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    const fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    const fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

use FieldKind::{Boolean, Number, Port, String as Text, Uri};

const PRODUCTION_ONLY: &[Tier] = &[Tier::Production];

/// Minimum secret length accepted in every tier.
pub const MIN_SECRET_LEN: usize = 32;

/// Minimum secret length accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 64;

/// The full rule table.
pub static SCHEMA: &[FieldRule] = &[
    // basic
    FieldRule::new("APP_ENV", Text)
        .default("development")
        .one_of(&["development", "test", "production"]),
    FieldRule::new("LOG_LEVEL", Text)
        .default("info")
        .one_of(&["error", "warn", "info", "debug", "trace"]),
    FieldRule::new("SERVICE_HOST", Text).default("localhost"),
    // secrets
    FieldRule::new("JWT_SECRET", Text)
        .required()
        .min(MIN_SECRET_LEN as f64)
        .secret(),
    FieldRule::new("JWT_REFRESH_SECRET", Text)
        .required()
        .min(MIN_SECRET_LEN as f64)
        .secret(),
    FieldRule::new("JWT_EXPIRES_IN", Text).default("15m"),
    FieldRule::new("JWT_REFRESH_EXPIRES_IN", Text).default("7d"),
    // database
    FieldRule::new("DATABASE_URL", Uri).required().secret(),
    FieldRule::new("AUTH_DATABASE_URL", Uri).secret(),
    FieldRule::new("USER_DATABASE_URL", Uri).secret(),
    FieldRule::new("CHAT_DATABASE_URL", Uri).secret(),
    FieldRule::new("ANALYTICS_DATABASE_URL", Uri).secret(),
    FieldRule::new("ADMIN_DATABASE_URL", Uri).secret(),
    // ports
    FieldRule::new("GATEWAY_PORT", Port).default("3000"),
    FieldRule::new("AUTH_SERVICE_PORT", Port).default("3001"),
    FieldRule::new("USER_SERVICE_PORT", Port).default("3002"),
    FieldRule::new("CHAT_SERVICE_PORT", Port).default("3003"),
    FieldRule::new("NOTIFICATION_SERVICE_PORT", Port).default("3004"),
    FieldRule::new("ANALYTICS_SERVICE_PORT", Port).default("3005"),
    FieldRule::new("FILE_SERVICE_PORT", Port).default("3006"),
    FieldRule::new("ADMIN_SERVICE_PORT", Port).default("3007"),
    // url overrides
    FieldRule::new("GATEWAY_URL", Uri),
    FieldRule::new("AUTH_SERVICE_URL", Uri),
    FieldRule::new("USER_SERVICE_URL", Uri),
    FieldRule::new("CHAT_SERVICE_URL", Uri),
    FieldRule::new("NOTIFICATION_SERVICE_URL", Uri),
    FieldRule::new("ANALYTICS_SERVICE_URL", Uri),
    FieldRule::new("FILE_SERVICE_URL", Uri),
    FieldRule::new("ADMIN_SERVICE_URL", Uri),
    // cache
    FieldRule::new("REDIS_HOST", Text).default("localhost"),
    FieldRule::new("REDIS_PORT", Port).default("6379"),
    FieldRule::new("REDIS_PASSWORD", Text).secret(),
    FieldRule::new("REDIS_DB", Number)
        .default("0")
        .integer()
        .min(0.0)
        .max(15.0),
    // mail relay
    FieldRule::new("SMTP_HOST", Text).required_in(PRODUCTION_ONLY),
    FieldRule::new("SMTP_PORT", Port).default("587"),
    FieldRule::new("SMTP_USER", Text),
    FieldRule::new("SMTP_PASS", Text).secret(),
    FieldRule::new("SMTP_SECURE", Boolean).default("false"),
    FieldRule::new("MAIL_FROM", Text),
    // uploads
    FieldRule::new("MAX_FILE_SIZE", Number)
        .default("10485760")
        .integer()
        .min(1.0),
    FieldRule::new("UPLOAD_DIR", Text).default("./uploads"),
    FieldRule::new("ALLOWED_FILE_TYPES", Text)
        .default("image/jpeg,image/png,image/gif,application/pdf"),
    // rate limiting
    FieldRule::new("RATE_LIMIT_WINDOW_MS", Number)
        .default("900000")
        .integer()
        .min(1000.0)
        .max(86_400_000.0),
    FieldRule::new("RATE_LIMIT_MAX_REQUESTS", Number)
        .default("100")
        .integer()
        .min(1.0)
        .max(1_000_000.0),
    // cors
    FieldRule::new("CORS_ORIGIN", Text).default("http://localhost:3000"),
    // monitoring
    FieldRule::new("ENABLE_METRICS", Boolean).default("false"),
    FieldRule::new("METRICS_PORT", Port).default("9090"),
    FieldRule::new("ENABLE_TRACING", Boolean).default("false"),
    FieldRule::new("HEALTH_CHECK_INTERVAL", Number)
        .default("30000")
        .integer()
        .min(1000.0),
    // external calls
    FieldRule::new("EXTERNAL_API_TIMEOUT", Number)
        .default("5000")
        .integer()
        .min(100.0)
        .max(60000.0),
    FieldRule::new("EXTERNAL_API_RETRIES", Number)
        .default("3")
        .integer()
        .min(0.0)
        .max(10.0),
];

/// Looks up the rule for `key`.
pub fn rule(key: &str) -> Option<&'static FieldRule> {
    SCHEMA.iter().find(|r| r.key == key)
}

/// Returns `true` if `key` is declared in [`SCHEMA`].
pub fn is_known_key(key: &str) -> bool {
    rule(key).is_some()
}

/// Returns `true` if the value of `key` should be masked when displayed.
///
/// Undeclared keys are judged by name.
pub fn is_secret_key(key: &str) -> bool {
    match rule(key) {
        Some(rule) => rule.secret,
        None => {
            let upper = key.to_ascii_uppercase();
            ["SECRET", "PASSWORD", "PASS", "TOKEN", "API_KEY"]
                .iter()
                .any(|marker| upper.contains(marker))
        }
    }
}

/// A coerced configuration value.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// String value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Validated URI, kept verbatim
    Uri(String),
    /// Port number
    Port(u16),
}

impl FieldValue {
    /// Returns the string payload of text and URI values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Uri(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload; ports count as numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Port(p) => Some(f64::from(*p)),
            _ => None,
        }
    }

    /// Returns the boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the port payload.
    pub fn as_port(&self) -> Option<u16> {
        match self {
            FieldValue::Port(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Uri(s) => f.write_str(s),
            // integral numbers print without a fractional part
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Port(p) => write!(f, "{}", p),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) | FieldValue::Uri(s) => serializer.serialize_str(s),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                serializer.serialize_i64(*n as i64)
            }
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Port(p) => serializer.serialize_u16(*p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_keys_are_unique() {
        let mut seen = HashSet::new();
        for rule in SCHEMA {
            assert!(seen.insert(rule.key), "duplicate rule for {}", rule.key);
        }
    }

    #[test]
    fn test_defaults_satisfy_their_own_rules() {
        use crate::domain::ConfigValue;
        for rule in SCHEMA {
            let Some(default) = rule.default else { continue };
            let value = ConfigValue::from(default);
            let ok = match rule.kind {
                FieldKind::String => true,
                FieldKind::Number => value.as_f64(rule.key).is_ok(),
                FieldKind::Boolean => value.as_bool(rule.key).is_ok(),
                FieldKind::Uri => value.as_uri(rule.key).is_ok(),
                FieldKind::Port => value.as_port(rule.key).is_ok(),
            };
            assert!(ok, "default for {} does not coerce", rule.key);
            if !rule.allowed.is_empty() {
                assert!(rule.allowed.contains(&default), "{}", rule.key);
            }
        }
    }

    #[test]
    fn test_requirement_applies_to() {
        assert!(Requirement::Always.applies_to(Tier::Test));
        assert!(!Requirement::Optional.applies_to(Tier::Production));
        let smtp = rule("SMTP_HOST").unwrap();
        assert!(smtp.required.applies_to(Tier::Production));
        assert!(!smtp.required.applies_to(Tier::Development));
    }

    #[test]
    fn test_secret_detection() {
        assert!(is_secret_key("JWT_SECRET"));
        assert!(is_secret_key("DATABASE_URL"));
        assert!(!is_secret_key("LOG_LEVEL"));
        assert!(is_secret_key("STRIPE_API_KEY"));
        assert!(!is_secret_key("FEATURE_FLAG"));
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Number(900000.0).to_string(), "900000");
        assert_eq!(FieldValue::Number(2.5).to_string(), "2.5");
        assert_eq!(FieldValue::Port(6379).to_string(), "6379");
        assert_eq!(FieldValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_field_value_serializes_integral_numbers_as_integers() {
        let json = serde_json::to_string(&FieldValue::Number(100.0)).unwrap();
        assert_eq!(json, "100");
    }
}
