// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema validation of the raw environment.
//!
//! Validation runs in two passes. The base pass walks every rule in
//! [`SCHEMA`](crate::domain::schema::SCHEMA), coercing values and applying
//! defaults. The overlay pass applies rules scoped to the deployment tier.
//! Both passes collect every violation instead of stopping at the first.

use crate::domain::schema::{self, FieldKind, FieldRule, FieldValue, MIN_PRODUCTION_SECRET_LEN};
use crate::domain::tier::TIER_KEY;
use crate::domain::{ConfigError, ConfigValue, EnvMap, FieldViolation, Result, Tier, ValidatedConfig};
use std::collections::BTreeMap;

/// Secrets that must be longer in production.
const PRODUCTION_SECRETS: &[&str] = &["JWT_SECRET", "JWT_REFRESH_SECRET"];

/// Validates raw environments against a rule table.
///
/// # Examples
///
/// ```rust
/// use unicfg::domain::{EnvMap, Tier};
/// use unicfg::service::SchemaValidator;
///
/// let raw: EnvMap = [
///     ("JWT_SECRET", "a".repeat(32)),
///     ("JWT_REFRESH_SECRET", "b".repeat(32)),
///     ("DATABASE_URL", "postgres://chat@db/chat".to_string()),
/// ]
/// .into_iter()
/// .collect();
///
/// let validated = SchemaValidator::new().validate(&raw, Tier::Development).unwrap();
/// assert_eq!(validated.port("REDIS_PORT"), Some(6379));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    rules: &'static [FieldRule],
}

impl SchemaValidator {
    /// Creates a validator for the platform schema.
    pub fn new() -> Self {
        Self {
            rules: schema::SCHEMA,
        }
    }

    /// Creates a validator for a custom rule table.
    pub fn with_rules(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    /// Resolves the deployment tier named by the raw environment.
    ///
    /// A missing or unrecognized value resolves to development; the base pass
    /// still reports an unrecognized value.
    pub fn tier_of(raw: &EnvMap) -> Tier {
        raw.get_non_empty(TIER_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Validates `raw` for `tier`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::SchemaValidation`] if any base rule fails; it carries
    ///   the overlay violations too.
    /// - [`ConfigError::TierValidation`] if only tier rules fail.
    pub fn validate(&self, raw: &EnvMap, tier: Tier) -> Result<ValidatedConfig> {
        let mut fields = BTreeMap::new();
        let mut base = Vec::new();

        for rule in self.rules {
            match raw.get_non_empty(rule.key) {
                Some(value) => match coerce(rule, value) {
                    Ok(coerced) => {
                        fields.insert(rule.key.to_string(), coerced);
                    }
                    Err(message) => base.push(FieldViolation::new(rule.key, message)),
                },
                None if rule.required.applies_to(tier) => {
                    base.push(FieldViolation::new(rule.key, requirement_message(rule, tier)));
                }
                None => {
                    if let Some(default) = rule.default {
                        match coerce(rule, default) {
                            Ok(coerced) => {
                                fields.insert(rule.key.to_string(), coerced);
                            }
                            Err(message) => base.push(FieldViolation::new(
                                rule.key,
                                format!("invalid default: {}", message),
                            )),
                        }
                    }
                }
            }
        }

        let overlay = overlay_violations(raw, tier);

        if !base.is_empty() {
            tracing::debug!(
                "Validation failed with {} base and {} {} violations",
                base.len(),
                overlay.len(),
                tier
            );
            base.extend(overlay);
            return Err(ConfigError::SchemaValidation { violations: base });
        }
        if !overlay.is_empty() {
            tracing::debug!("Validation failed with {} {} violations", overlay.len(), tier);
            return Err(ConfigError::TierValidation {
                tier,
                violations: overlay,
            });
        }

        let passthrough: EnvMap = raw
            .iter()
            .filter(|(key, _)| !self.rules.iter().any(|r| r.key == *key))
            .collect();

        Ok(ValidatedConfig {
            tier,
            fields,
            passthrough,
        })
    }

    /// Checks a single value against its rule.
    ///
    /// Returns `Ok(None)` for keys the schema does not declare.
    pub fn check_value(
        &self,
        key: &str,
        value: &str,
    ) -> std::result::Result<Option<FieldValue>, FieldViolation> {
        match self.rules.iter().find(|r| r.key == key) {
            Some(rule) => coerce(rule, value)
                .map(Some)
                .map_err(|message| FieldViolation::new(key, message)),
            None => Ok(None),
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn requirement_message(rule: &FieldRule, tier: Tier) -> String {
    match rule.required {
        schema::Requirement::InTiers(_) => format!("is required in {}", tier),
        _ => "is required".to_string(),
    }
}

/// Coerces one non-empty raw value according to `rule`.
fn coerce(rule: &FieldRule, raw: &str) -> std::result::Result<FieldValue, String> {
    let value = ConfigValue::from(raw);
    let kind_error = |_: ConfigError| {
        if rule.secret {
            format!("must be a valid {}", rule.kind.as_str())
        } else {
            format!("must be a valid {}, got '{}'", rule.kind.as_str(), raw.trim())
        }
    };

    let coerced = match rule.kind {
        FieldKind::String if rule.key == TIER_KEY => match raw.parse::<Tier>() {
            Ok(tier) => FieldValue::Text(tier.as_str().to_string()),
            Err(_) => FieldValue::Text(raw.trim().to_string()),
        },
        FieldKind::String => FieldValue::Text(raw.to_string()),
        FieldKind::Number => FieldValue::Number(value.as_f64(rule.key).map_err(kind_error)?),
        FieldKind::Boolean => FieldValue::Bool(value.as_bool(rule.key).map_err(kind_error)?),
        FieldKind::Uri => FieldValue::Uri(value.as_uri(rule.key).map_err(kind_error)?),
        FieldKind::Port => FieldValue::Port(value.as_port(rule.key).map_err(kind_error)?),
    };

    if let FieldValue::Text(text) = &coerced {
        if !rule.allowed.is_empty() && !rule.allowed.contains(&text.as_str()) {
            return Err(format!("must be one of {}", rule.allowed.join(", ")));
        }
        let len = text.chars().count() as f64;
        if let Some(min) = rule.min.filter(|min| len < *min) {
            return Err(format!("must be at least {} characters", min));
        }
        if let Some(max) = rule.max.filter(|max| len > *max) {
            return Err(format!("must be at most {} characters", max));
        }
    }

    if let FieldValue::Number(n) = coerced {
        if rule.integer && n.fract() != 0.0 {
            return Err(format!("must be a whole number, got '{}'", raw.trim()));
        }
        if let Some(min) = rule.min.filter(|min| n < *min) {
            return Err(format!("must be at least {}", min));
        }
        if let Some(max) = rule.max.filter(|max| n > *max) {
            return Err(format!("must be at most {}", max));
        }
    }

    Ok(coerced)
}

/// Rules that apply only in a given tier.
fn overlay_violations(raw: &EnvMap, tier: Tier) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    match tier {
        Tier::Production => {
            let cors = raw
                .get_non_empty("CORS_ORIGIN")
                .or_else(|| schema::rule("CORS_ORIGIN").and_then(|r| r.default))
                .unwrap_or_default();
            if cors.split(',').any(|origin| origin.trim() == "*") {
                violations.push(FieldViolation::new(
                    "CORS_ORIGIN",
                    "wildcard origin is not allowed in production",
                ));
            }

            for key in PRODUCTION_SECRETS {
                let len = raw.get_non_empty(key).map(|s| s.chars().count()).unwrap_or(0);
                if len < MIN_PRODUCTION_SECRET_LEN {
                    violations.push(FieldViolation::new(
                        *key,
                        format!(
                            "must be at least {} characters in production",
                            MIN_PRODUCTION_SECRET_LEN
                        ),
                    ));
                }
            }

            if raw.get_non_empty("REDIS_HOST").is_none() {
                violations.push(FieldViolation::new(
                    "REDIS_HOST",
                    "must be set explicitly in production",
                ));
            }
        }
        Tier::Test => {
            let production = raw.get_non_empty("PRODUCTION_DATABASE_URL").map(str::trim);
            let current = raw.get_non_empty("DATABASE_URL").map(str::trim);
            if production.is_some() && production == current {
                violations.push(FieldViolation::new(
                    "DATABASE_URL",
                    "must not point at the production database in test",
                ));
            }
        }
        Tier::Development => {}
    }

    violations
}
