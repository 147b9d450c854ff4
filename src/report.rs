// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health and status reporting over a configuration snapshot.
//!
//! A [`HealthReport`] summarizes what is configured without exposing secret
//! values. Status depends only on the basic required fields; the warning rules
//! are advisory and are all evaluated, so a report lists every problem found.

use crate::domain::{ConfigError, ConfigSnapshot, CorsOrigin, Result, Tier, SERVICES};
use crate::domain::schema::MIN_SECRET_LEN;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Fields whose absence makes a configuration unhealthy.
pub const BASIC_REQUIRED_FIELDS: &[&str] =
    &["APP_ENV", "JWT_SECRET", "JWT_REFRESH_SECRET", "DATABASE_URL"];

/// Production request ceiling above which a warning is raised.
pub const PRODUCTION_RATE_LIMIT_CEILING: u64 = 1000;

/// Overall health.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every check passed
    Healthy,
    /// At least one check failed
    Unhealthy,
}

/// Outcome of one required-field check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Check {
    /// Field that was checked
    pub field: String,
    /// Whether the field has a value
    pub passed: bool,
    /// Human readable outcome
    pub message: String,
}

/// Per-service summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Whether a port is configured
    pub configured: bool,
    /// Listen port
    pub port: Option<u16>,
    /// Base URL
    pub url: Option<String>,
}

/// Which connection strings are present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseStatus {
    /// Whether the shared connection string is set
    pub primary: bool,
    /// Whether each component has its own connection string
    pub overrides: BTreeMap<String, bool>,
}

/// Security posture flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SecurityStatus {
    /// Both token secrets are set
    pub jwt_configured: bool,
    /// At least one origin is allowed
    pub cors_configured: bool,
    /// Rate limiting is active
    pub rate_limit_configured: bool,
}

/// Monitoring flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonitoringStatus {
    /// Metrics endpoint enabled
    pub metrics_enabled: bool,
    /// Tracing enabled
    pub tracing_enabled: bool,
    /// Metrics listen port
    pub metrics_port: Option<u16>,
}

/// A structured health document for one snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthReport {
    /// Overall status
    pub status: HealthStatus,
    /// Deployment tier
    pub tier: Tier,
    /// When the report was built
    pub generated_at: DateTime<Utc>,
    /// Required-field checks
    pub checks: Vec<Check>,
    /// Per-service summaries keyed by service name
    pub services: BTreeMap<String, ServiceStatus>,
    /// Connection string presence
    pub database: DatabaseStatus,
    /// Security posture
    pub security: SecurityStatus,
    /// Monitoring settings
    pub monitoring: MonitoringStatus,
    /// Advisory findings
    pub warnings: Vec<String>,
}

impl HealthReport {
    /// Returns `true` if every check passed.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Failed checks only.
    pub fn failed_checks(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| !c.passed)
    }

    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::ReportGeneration {
            message: e.to_string(),
        })
    }

    /// Serializes the report as YAML.
    #[cfg(feature = "yaml")]
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ReportGeneration {
            message: e.to_string(),
        })
    }
}

/// Returns `true` if `value` looks like a placeholder rather than a real secret.
pub fn is_placeholder_secret(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.contains("change-this")
        || lower.contains("your-")
        || lower == "secret"
        || value.chars().count() < MIN_SECRET_LEN
}

/// Builds a health report for `snapshot`.
pub fn generate_report(snapshot: &ConfigSnapshot) -> HealthReport {
    let validated = snapshot.validated();
    let derived = snapshot.derived();
    let tier = snapshot.tier();

    let checks: Vec<Check> = BASIC_REQUIRED_FIELDS
        .iter()
        .map(|field| {
            let passed = validated
                .raw(field)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            Check {
                field: field.to_string(),
                passed,
                message: if passed {
                    format!("{} is configured", field)
                } else {
                    format!("{} is missing", field)
                },
            }
        })
        .collect();

    let status = if checks.iter().all(|c| c.passed) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let services = SERVICES
        .iter()
        .map(|service| {
            let port = validated.port(service.port_key);
            let status = ServiceStatus {
                configured: port.is_some(),
                port,
                url: derived.services.get(service.name).map(str::to_string),
            };
            (service.name.to_string(), status)
        })
        .collect();

    let database = DatabaseStatus {
        primary: validated.text("DATABASE_URL").is_some(),
        overrides: SERVICES
            .iter()
            .filter_map(|s| s.database_key.map(|key| (s.name, key)))
            .map(|(name, key)| (name.to_string(), validated.text(key).is_some()))
            .collect(),
    };

    let jwt_secret = validated.text("JWT_SECRET");
    let jwt_refresh_secret = validated.text("JWT_REFRESH_SECRET");
    let security = SecurityStatus {
        jwt_configured: jwt_secret.is_some() && jwt_refresh_secret.is_some(),
        cors_configured: match &derived.cors.origin {
            CorsOrigin::Any => true,
            CorsOrigin::List(origins) => !origins.is_empty(),
        },
        rate_limit_configured: derived.rate_limit.max_requests > 0,
    };

    let monitoring = MonitoringStatus {
        metrics_enabled: validated.flag("ENABLE_METRICS").unwrap_or(false),
        tracing_enabled: validated.flag("ENABLE_TRACING").unwrap_or(false),
        metrics_port: validated.port("METRICS_PORT"),
    };

    let mut warnings = Vec::new();
    let production = tier.is_production();

    if production && derived.cors.origin == CorsOrigin::Any {
        warnings.push("CORS allows every origin in production".to_string());
    }
    if production && matches!(derived.cache.host.as_str(), "" | "localhost") {
        warnings.push("Cache host is not set for production; using localhost".to_string());
    }
    for (key, value) in [
        ("JWT_SECRET", jwt_secret),
        ("JWT_REFRESH_SECRET", jwt_refresh_secret),
    ] {
        if let Some(value) = value {
            if is_placeholder_secret(value) {
                warnings.push(format!("{} uses a placeholder or weak value", key));
            }
        }
    }
    if production && !monitoring.metrics_enabled {
        warnings.push("Metrics are disabled in production".to_string());
    }
    if production && derived.rate_limit.max_requests > PRODUCTION_RATE_LIMIT_CEILING {
        warnings.push(format!(
            "Rate limit of {} requests per window exceeds {} in production",
            derived.rate_limit.max_requests, PRODUCTION_RATE_LIMIT_CEILING
        ));
    }

    for warning in &warnings {
        tracing::debug!("Health warning: {}", warning);
    }

    HealthReport {
        status,
        tier,
        generated_at: Utc::now(),
        checks,
        services,
        database,
        security,
        monitoring,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvMap;
    use crate::service::{derive, SchemaValidator};

    const SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const REFRESH: &str = "fedcba9876543210fedcba9876543210fedcba9876543210fedcba9876543210";

    fn snapshot(pairs: &[(&str, &str)], tier: Tier) -> ConfigSnapshot {
        let env: EnvMap = pairs.iter().copied().collect();
        let validated = SchemaValidator::new().validate(&env, tier).unwrap();
        let derived = derive(&validated);
        ConfigSnapshot::new(validated, derived)
    }

    fn development() -> ConfigSnapshot {
        snapshot(
            &[
                ("JWT_SECRET", SECRET),
                ("JWT_REFRESH_SECRET", REFRESH),
                ("DATABASE_URL", "postgresql://app:pw@db:5432/app"),
                ("CHAT_DATABASE_URL", "postgresql://chat:pw@db:5432/chat"),
            ],
            Tier::Development,
        )
    }

    #[test]
    fn test_healthy_development_report() {
        let report = generate_report(&development());
        assert!(report.is_healthy());
        assert_eq!(report.checks.len(), BASIC_REQUIRED_FIELDS.len());
        assert!(report.warnings.is_empty());
        assert_eq!(report.services.len(), SERVICES.len());
        assert_eq!(report.services["chat"].port, Some(3003));
        assert!(report.database.primary);
        assert_eq!(report.database.overrides["chat"], true);
        assert_eq!(report.database.overrides["auth"], false);
        assert!(report.security.jwt_configured);
    }

    #[test]
    fn test_missing_database_url_is_unhealthy() {
        let mut snap = development();
        let mut validated = snap.validated().clone();
        validated.fields.remove("DATABASE_URL");
        snap = ConfigSnapshot::new(validated.clone(), derive(&validated));

        let report = generate_report(&snap);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        let failed: Vec<_> = report.failed_checks().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].field, "DATABASE_URL");
        assert!(!report.database.primary);
    }

    #[test]
    fn test_production_warnings_are_all_evaluated() {
        let snap = snapshot(
            &[
                ("APP_ENV", "production"),
                ("JWT_SECRET", SECRET),
                ("JWT_REFRESH_SECRET", REFRESH),
                ("DATABASE_URL", "postgresql://app:pw@db:5432/app"),
                ("REDIS_HOST", "cache.internal"),
                ("SMTP_HOST", "smtp.internal"),
                ("CORS_ORIGIN", "https://chat.example.com"),
                ("RATE_LIMIT_MAX_REQUESTS", "5000"),
            ],
            Tier::Production,
        );
        let report = generate_report(&snap);
        assert!(report.is_healthy());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("Metrics")));
        assert!(report.warnings.iter().any(|w| w.contains("5000")));
    }

    #[test]
    fn test_placeholder_secret_detection() {
        assert!(is_placeholder_secret("change-this-jwt-secret-in-production"));
        assert!(is_placeholder_secret("your-super-secret-key-goes-here-please-now"));
        assert!(is_placeholder_secret("secret"));
        assert!(is_placeholder_secret("short"));
        assert!(!is_placeholder_secret(SECRET));
    }

    #[test]
    fn test_placeholder_secret_warns_in_any_tier() {
        let snap = snapshot(
            &[
                ("JWT_SECRET", "change-this-jwt-secret-in-production"),
                ("JWT_REFRESH_SECRET", REFRESH),
                ("DATABASE_URL", "postgresql://app:pw@db:5432/app"),
            ],
            Tier::Development,
        );
        let report = generate_report(&snap);
        assert_eq!(report.warnings, vec!["JWT_SECRET uses a placeholder or weak value"]);
    }

    #[test]
    fn test_json_omits_secret_values() {
        let json = generate_report(&development()).to_json().unwrap();
        assert!(json.contains("\"status\": \"healthy\""));
        assert!(!json.contains(SECRET));
        assert!(!json.contains("pw@db"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_output() {
        let yaml = generate_report(&development()).to_yaml().unwrap();
        assert!(yaml.contains("status: healthy"));
        assert!(yaml.contains("tier: development"));
    }
}
