// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validated, derived and snapshot configuration types.
//!
//! A [`ConfigSnapshot`] pairs a [`ValidatedConfig`] with the [`DerivedConfig`]
//! computed from it. Snapshots are immutable; the authority replaces them
//! wholesale on every load.

use crate::domain::config_key::ConfigKey;
use crate::domain::config_value::ConfigValue;
use crate::domain::env_map::EnvMap;
use crate::domain::errors::{ConfigError, Result};
use crate::domain::schema::FieldValue;
use crate::domain::service::{find_service, ServiceConfig};
use crate::domain::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Configuration after schema validation, with defaults applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedConfig {
    pub(crate) tier: Tier,
    pub(crate) fields: BTreeMap<String, FieldValue>,
    pub(crate) passthrough: EnvMap,
}

impl ValidatedConfig {
    /// The deployment tier the configuration was validated for.
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Returns the coerced value of a declared field.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Iterates over all declared fields that have a value.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Raw keys that are not part of the schema, kept verbatim.
    pub fn passthrough(&self) -> &EnvMap {
        &self.passthrough
    }

    /// Returns a text or URI field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_text)
    }

    /// Returns a numeric field.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(FieldValue::as_number)
    }

    /// Returns a boolean field.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(FieldValue::as_bool)
    }

    /// Returns a port field.
    pub fn port(&self, key: &str) -> Option<u16> {
        self.fields.get(key).and_then(FieldValue::as_port)
    }

    /// Returns any value, declared or passthrough, rendered as a string.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(ToString::to_string)
            .or_else(|| self.passthrough.get(key).map(str::to_string))
    }
}

impl Serialize for ValidatedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.passthrough.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in self.passthrough.iter() {
            if !self.fields.contains_key(key) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Base URL of every known service, keyed by service name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ServiceUrlMap(pub(crate) BTreeMap<String, String>);

impl ServiceUrlMap {
    /// Returns the base URL for `service`.
    pub fn get(&self, service: &str) -> Option<&str> {
        self.0.get(service).map(String::as_str)
    }

    /// Iterates over `(service, url)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Connection strings: a default plus per-component overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseConfigMap {
    /// The shared connection string
    pub default: String,
    /// Per-component connection strings; equal to `default` without an override
    #[serde(flatten)]
    pub components: BTreeMap<String, String>,
}

impl DatabaseConfigMap {
    /// Returns the connection string for `component`, falling back to the default.
    pub fn for_component(&self, component: &str) -> &str {
        self.components
            .get(component)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Cache client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Cache host name
    pub host: String,
    /// Cache port
    pub port: u16,
    /// Optional password
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Logical database index
    pub db: u8,
    /// Whether the client probes readiness before use; always off
    pub enable_ready_check: bool,
    /// Per-request retry limit; `None` retries without bound
    pub max_retries_per_request: Option<u32>,
}

/// Allowed request origins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorsOrigin {
    /// Every origin is allowed
    Any,
    /// Only the listed origins are allowed, in configured order
    List(Vec<String>),
}

impl Serialize for CorsOrigin {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CorsOrigin::Any => serializer.serialize_str("*"),
            CorsOrigin::List(origins) => origins.serialize(serializer),
        }
    }
}

/// CORS policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CorsConfig {
    /// Allowed origins
    pub origin: CorsOrigin,
    /// Whether credentials are allowed; always on
    pub credentials: bool,
}

impl CorsConfig {
    /// Returns `true` if requests from `origin` are allowed.
    pub fn allows(&self, origin: &str) -> bool {
        match &self.origin {
            CorsOrigin::Any => true,
            CorsOrigin::List(origins) => origins.iter().any(|o| o == origin),
        }
    }
}

/// Rate limiting policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Maximum requests per window
    pub max_requests: u64,
    /// Response message when the limit is hit
    pub message: String,
    /// Whether to send `RateLimit-*` headers
    pub standard_headers: bool,
    /// Whether to send legacy `X-RateLimit-*` headers
    pub legacy_headers: bool,
}

/// Configuration groups computed from a [`ValidatedConfig`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DerivedConfig {
    /// Service base URLs
    pub services: ServiceUrlMap,
    /// Connection strings
    pub database: DatabaseConfigMap,
    /// Cache client settings
    pub cache: CacheConfig,
    /// CORS policy
    pub cors: CorsConfig,
    /// Rate limiting policy
    pub rate_limit: RateLimitConfig,
}

/// An immutable pairing of validated and derived configuration.
#[derive(Clone, Debug)]
pub struct ConfigSnapshot {
    validated: ValidatedConfig,
    derived: DerivedConfig,
    loaded_at: DateTime<Utc>,
    flat: BTreeMap<String, String>,
}

impl ConfigSnapshot {
    /// Builds a snapshot and indexes it for dotted-path lookups.
    pub fn new(validated: ValidatedConfig, derived: DerivedConfig) -> Self {
        let mut flat = BTreeMap::new();
        for (key, value) in validated.fields() {
            flat.insert(key.to_string(), value.to_string());
            flat.insert(format!("env.{}", key), value.to_string());
        }
        for (key, value) in validated.passthrough().iter() {
            flat.entry(key.to_string()).or_insert_with(|| value.to_string());
            flat.entry(format!("env.{}", key))
                .or_insert_with(|| value.to_string());
        }
        flat.insert("tier".to_string(), validated.tier().to_string());
        match serde_json::to_value(&derived) {
            Ok(value) => flatten_json(&value, "", &mut flat),
            Err(e) => tracing::error!("Failed to index derived configuration: {}", e),
        }

        Self {
            validated,
            derived,
            loaded_at: Utc::now(),
            flat,
        }
    }

    /// The validated primary values.
    pub fn validated(&self) -> &ValidatedConfig {
        &self.validated
    }

    /// The derived groups.
    pub fn derived(&self) -> &DerivedConfig {
        &self.derived
    }

    /// The deployment tier.
    pub fn tier(&self) -> Tier {
        self.validated.tier
    }

    /// When the snapshot was built.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Looks up a dotted path.
    pub fn get(&self, key: &ConfigKey) -> Result<ConfigValue> {
        let path = key.segments().collect::<Vec<_>>().join(".");
        self.flat
            .get(&path)
            .map(|v| ConfigValue::from(v.as_str()))
            .ok_or_else(|| ConfigError::ConfigKeyNotFound {
                key: key.to_string(),
            })
    }

    /// Iterates over every addressable dotted path and its value.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.flat.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Projects the configuration for one service.
    ///
    /// Unknown names never fail: the port comes from `{NAME}_SERVICE_PORT` if
    /// that key is set to a valid port.
    pub fn service_config(&self, name: &str) -> ServiceConfig {
        let v = &self.validated;
        let d = &self.derived;
        let shared = |port: Option<u16>, url: Option<String>, known: bool| ServiceConfig {
            name: name.to_string(),
            known,
            port,
            url,
            log_level: v.text("LOG_LEVEL").unwrap_or("info").to_string(),
            jwt_secret: v.text("JWT_SECRET").unwrap_or_default().to_string(),
            jwt_refresh_secret: v.text("JWT_REFRESH_SECRET").unwrap_or_default().to_string(),
            cors: d.cors.clone(),
            rate_limit: d.rate_limit.clone(),
            database_url: None,
            cache: None,
        };

        match find_service(name) {
            Some(service) => {
                let mut config = shared(
                    v.port(service.port_key),
                    d.services.get(service.name).map(str::to_string),
                    true,
                );
                if service.database_key.is_some() {
                    config.database_url =
                        Some(d.database.for_component(service.name).to_string());
                }
                if service.uses_cache {
                    config.cache = Some(d.cache.clone());
                }
                config
            }
            None => {
                let key = ConfigKey::service_port(name);
                let port = v
                    .passthrough()
                    .get(key.as_str())
                    .and_then(|raw| ConfigValue::from(raw).as_port(key.as_str()).ok());
                let host = v.text("SERVICE_HOST").unwrap_or("localhost");
                let url = port.map(|p| format!("http://{}:{}", host, p));
                tracing::debug!(
                    "Service '{}' is not a known service; resolved port {:?} from {}",
                    name,
                    port,
                    key
                );
                shared(port, url, false)
            }
        }
    }
}

impl PartialEq for ConfigSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.validated == other.validated && self.derived == other.derived
    }
}

/// Flattens a JSON value into dotted keys.
///
/// Arrays produce indexed keys plus the parent key holding the comma-joined
/// elements.
fn flatten_json(value: &serde_json::Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    use serde_json::Value;
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten_json(val, &join(key), out);
            }
        }
        Value::Array(items) => {
            let mut joined = Vec::with_capacity(items.len());
            for (i, val) in items.iter().enumerate() {
                flatten_json(val, &join(&i.to_string()), out);
                if let Some(s) = val.as_str() {
                    joined.push(s.to_string());
                }
            }
            out.insert(prefix.to_string(), joined.join(","));
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_objects_and_arrays() {
        let value = json!({
            "cors": { "origin": ["https://a.com", "https://b.com"], "credentials": true },
            "cache": { "port": 6379, "max_retries_per_request": null }
        });
        let mut out = BTreeMap::new();
        flatten_json(&value, "", &mut out);
        assert_eq!(out["cors.origin.0"], "https://a.com");
        assert_eq!(out["cors.origin.1"], "https://b.com");
        assert_eq!(out["cors.origin"], "https://a.com,https://b.com");
        assert_eq!(out["cors.credentials"], "true");
        assert_eq!(out["cache.port"], "6379");
        assert_eq!(out["cache.max_retries_per_request"], "");
    }

    #[test]
    fn test_database_for_component_falls_back() {
        let mut components = BTreeMap::new();
        components.insert("auth".to_string(), "postgres://auth".to_string());
        let db = DatabaseConfigMap {
            default: "postgres://main".to_string(),
            components,
        };
        assert_eq!(db.for_component("auth"), "postgres://auth");
        assert_eq!(db.for_component("chat"), "postgres://main");
    }

    #[test]
    fn test_cors_allows() {
        let any = CorsConfig {
            origin: CorsOrigin::Any,
            credentials: true,
        };
        assert!(any.allows("https://evil.example"));
        let list = CorsConfig {
            origin: CorsOrigin::List(vec!["https://a.com".to_string()]),
            credentials: true,
        };
        assert!(list.allows("https://a.com"));
        assert!(!list.allows("https://b.com"));
    }

    #[test]
    fn test_cors_origin_serialization() {
        assert_eq!(serde_json::to_value(CorsOrigin::Any).unwrap(), json!("*"));
        assert_eq!(
            serde_json::to_value(CorsOrigin::List(vec!["x".to_string()])).unwrap(),
            json!(["x"])
        );
    }

    #[test]
    fn test_cache_password_is_not_serialized() {
        let cache = CacheConfig {
            host: "cache".to_string(),
            port: 6379,
            password: Some("hunter2".to_string()),
            db: 0,
            enable_ready_check: false,
            max_retries_per_request: None,
        };
        let json = serde_json::to_string(&cache).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
