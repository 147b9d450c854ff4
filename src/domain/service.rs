// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration service trait and service projections.
//!
//! This module defines the `ConfigurationService` trait, the accessor interface
//! the rest of the platform uses, together with the table of known platform
//! services and the per-service projection returned by
//! [`ConfigurationService::service_config`].

use crate::domain::snapshot::{CacheConfig, ConfigSnapshot, CorsConfig, RateLimitConfig};
use crate::domain::{ConfigKey, ConfigValue, Result};
use serde::Serialize;
use std::sync::Arc;

/// Static description of one platform service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Short name used by callers (`auth`, `chat`, ...)
    pub name: &'static str,
    /// Key holding the listen port
    pub port_key: &'static str,
    /// Key holding an explicit base URL override
    pub url_key: &'static str,
    /// Key holding a per-service database override, if the service has a database
    pub database_key: Option<&'static str>,
    /// Whether the service talks to the cache
    pub uses_cache: bool,
}

/// The eight named platform services, in canonical order.
pub static SERVICES: &[ServiceDescriptor] = &[
    ServiceDescriptor {
        name: "gateway",
        port_key: "GATEWAY_PORT",
        url_key: "GATEWAY_URL",
        database_key: None,
        uses_cache: true,
    },
    ServiceDescriptor {
        name: "auth",
        port_key: "AUTH_SERVICE_PORT",
        url_key: "AUTH_SERVICE_URL",
        database_key: Some("AUTH_DATABASE_URL"),
        uses_cache: true,
    },
    ServiceDescriptor {
        name: "user",
        port_key: "USER_SERVICE_PORT",
        url_key: "USER_SERVICE_URL",
        database_key: Some("USER_DATABASE_URL"),
        uses_cache: false,
    },
    ServiceDescriptor {
        name: "chat",
        port_key: "CHAT_SERVICE_PORT",
        url_key: "CHAT_SERVICE_URL",
        database_key: Some("CHAT_DATABASE_URL"),
        uses_cache: true,
    },
    ServiceDescriptor {
        name: "notification",
        port_key: "NOTIFICATION_SERVICE_PORT",
        url_key: "NOTIFICATION_SERVICE_URL",
        database_key: None,
        uses_cache: true,
    },
    ServiceDescriptor {
        name: "analytics",
        port_key: "ANALYTICS_SERVICE_PORT",
        url_key: "ANALYTICS_SERVICE_URL",
        database_key: Some("ANALYTICS_DATABASE_URL"),
        uses_cache: false,
    },
    ServiceDescriptor {
        name: "file",
        port_key: "FILE_SERVICE_PORT",
        url_key: "FILE_SERVICE_URL",
        database_key: None,
        uses_cache: false,
    },
    ServiceDescriptor {
        name: "admin",
        port_key: "ADMIN_SERVICE_PORT",
        url_key: "ADMIN_SERVICE_URL",
        database_key: Some("ADMIN_DATABASE_URL"),
        uses_cache: false,
    },
];

/// Looks up a known service by name.
///
/// Matching is case-insensitive and accepts a `-service` suffix, so
/// `"Chat"` and `"chat-service"` both resolve to `chat`.
pub fn find_service(name: &str) -> Option<&'static ServiceDescriptor> {
    let normalized = name.trim().to_ascii_lowercase();
    let normalized = normalized
        .strip_suffix("-service")
        .unwrap_or(normalized.as_str());
    SERVICES.iter().find(|s| s.name == normalized)
}

/// Configuration projected for a single service.
///
/// Shared fields are the same for every service; component fields depend on
/// what the service uses. Unknown services get the shared fields plus a port
/// resolved by naming convention.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceConfig {
    /// Service name as requested
    pub name: String,
    /// Whether the name matched a known service
    pub known: bool,
    /// Listen port, if one could be resolved
    pub port: Option<u16>,
    /// Base URL other services use to reach this one
    pub url: Option<String>,
    /// Shared log level
    pub log_level: String,
    /// Shared access-token secret
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Shared refresh-token secret
    #[serde(skip_serializing)]
    pub jwt_refresh_secret: String,
    /// Shared CORS policy
    pub cors: CorsConfig,
    /// Shared rate limit policy
    pub rate_limit: RateLimitConfig,
    /// Connection string for services with a database
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    /// Cache settings for services that use the cache
    pub cache: Option<CacheConfig>,
}

/// The main configuration accessor trait.
///
/// Every accessor fails with [`ConfigError::NotInitialized`] until the first
/// successful load.
///
/// [`ConfigError::NotInitialized`]: crate::domain::ConfigError::NotInitialized
///
/// # Examples
///
/// ```rust
/// use unicfg::domain::{ConfigKey, ConfigurationService};
///
/// fn cache_port(config: &dyn ConfigurationService) -> u16 {
///     config
///         .get_or(&ConfigKey::from("cache.port"), "6379")
///         .and_then(|v| v.as_port("cache.port"))
///         .unwrap_or(6379)
/// }
/// ```
pub trait ConfigurationService: Send + Sync {
    /// Retrieves the value at a dotted path in the current snapshot.
    ///
    /// Paths address the flattened snapshot: raw keys under `env.` (and at
    /// top level), derived groups under `services.`, `database.`, `cache.`,
    /// `cors.` and `rate_limit.`.
    fn get(&self, key: &ConfigKey) -> Result<ConfigValue>;

    /// Retrieves a value or `fallback` if the path is missing.
    ///
    /// The only error is use before initialization.
    fn get_or(&self, key: &ConfigKey, fallback: &str) -> Result<ConfigValue> {
        match self.get(key) {
            Ok(value) => Ok(value),
            Err(crate::domain::ConfigError::ConfigKeyNotFound { .. }) => {
                Ok(ConfigValue::from(fallback))
            }
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if the path resolves in the current snapshot.
    fn has(&self, key: &ConfigKey) -> bool {
        self.get(key).is_ok()
    }

    /// Returns a copy of the current snapshot.
    fn get_all(&self) -> Result<ConfigSnapshot>;

    /// Returns the current snapshot handle without copying.
    fn snapshot(&self) -> Result<Arc<ConfigSnapshot>>;

    /// Projects the configuration for one service.
    fn service_config(&self, name: &str) -> Result<ServiceConfig> {
        Ok(self.snapshot()?.service_config(name))
    }

    /// Re-reads all sources and installs a new snapshot.
    ///
    /// On failure the previous snapshot stays active and
    /// [`ConfigError::ReloadFailed`](crate::domain::ConfigError::ReloadFailed)
    /// is returned.
    fn reload(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigError;

    struct EmptyService;

    impl ConfigurationService for EmptyService {
        fn get(&self, key: &ConfigKey) -> Result<ConfigValue> {
            if key.as_str() == "present" {
                Ok(ConfigValue::from("value"))
            } else {
                Err(ConfigError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }

        fn get_all(&self) -> Result<ConfigSnapshot> {
            Err(ConfigError::NotInitialized)
        }

        fn snapshot(&self) -> Result<Arc<ConfigSnapshot>> {
            Err(ConfigError::NotInitialized)
        }

        fn reload(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_get_or_uses_fallback_for_missing_path() {
        let service = EmptyService;
        let value = service.get_or(&ConfigKey::from("missing"), "dflt").unwrap();
        assert_eq!(value.as_str(), "dflt");
        let value = service.get_or(&ConfigKey::from("present"), "dflt").unwrap();
        assert_eq!(value.as_str(), "value");
    }

    #[test]
    fn test_has() {
        let service = EmptyService;
        assert!(service.has(&ConfigKey::from("present")));
        assert!(!service.has(&ConfigKey::from("missing")));
    }

    #[test]
    fn test_service_config_before_load_fails() {
        let service = EmptyService;
        assert!(matches!(
            service.service_config("auth"),
            Err(ConfigError::NotInitialized)
        ));
    }

    #[test]
    fn test_find_service() {
        assert_eq!(find_service("chat").unwrap().port_key, "CHAT_SERVICE_PORT");
        assert_eq!(find_service("Chat-Service").unwrap().name, "chat");
        assert!(find_service("billing").is_none());
    }

    #[test]
    fn test_service_table_matches_schema() {
        for service in SERVICES {
            assert!(crate::domain::schema::is_known_key(service.port_key));
            assert!(crate::domain::schema::is_known_key(service.url_key));
            if let Some(db) = service.database_key {
                assert!(crate::domain::schema::is_known_key(db));
            }
        }
        assert_eq!(SERVICES.len(), 8);
    }
}
