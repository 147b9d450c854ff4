// SPDX-License-Identifier: MIT OR Apache-2.0

//! Derivation of computed configuration groups.
//!
//! [`derive`] is a pure function of the validated configuration. Every load
//! recomputes all groups; nothing is patched in place.

use crate::domain::snapshot::{
    CacheConfig, CorsConfig, CorsOrigin, DatabaseConfigMap, DerivedConfig, RateLimitConfig,
    ServiceUrlMap,
};
use crate::domain::{ValidatedConfig, SERVICES};
use std::collections::BTreeMap;

/// Message returned to clients that exceed the rate limit.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Computes the derived groups for `validated`.
///
/// # Examples
///
/// ```rust
/// use unicfg::domain::{CorsOrigin, EnvMap, Tier};
/// use unicfg::service::{derive, SchemaValidator};
///
/// let raw: EnvMap = [
///     ("JWT_SECRET", "a".repeat(32)),
///     ("JWT_REFRESH_SECRET", "b".repeat(32)),
///     ("DATABASE_URL", "postgres://chat@db/chat".to_string()),
///     ("CORS_ORIGIN", "*".to_string()),
/// ]
/// .into_iter()
/// .collect();
/// let validated = SchemaValidator::new().validate(&raw, Tier::Development).unwrap();
///
/// let derived = derive(&validated);
/// assert_eq!(derived.cors.origin, CorsOrigin::Any);
/// assert_eq!(derived.services.get("chat"), Some("http://localhost:3003"));
/// ```
pub fn derive(validated: &ValidatedConfig) -> DerivedConfig {
    DerivedConfig {
        services: service_urls(validated),
        database: databases(validated),
        cache: cache(validated),
        cors: cors(validated),
        rate_limit: rate_limit(validated),
    }
}

fn service_urls(v: &ValidatedConfig) -> ServiceUrlMap {
    let host = v.text("SERVICE_HOST").unwrap_or("localhost");
    let urls = SERVICES
        .iter()
        .filter_map(|service| {
            let url = match v.text(service.url_key) {
                Some(url) => url.to_string(),
                None => format!("http://{}:{}", host, v.port(service.port_key)?),
            };
            Some((service.name.to_string(), url))
        })
        .collect();
    ServiceUrlMap(urls)
}

fn databases(v: &ValidatedConfig) -> DatabaseConfigMap {
    let default = v.text("DATABASE_URL").unwrap_or_default().to_string();
    let components: BTreeMap<String, String> = SERVICES
        .iter()
        .filter_map(|service| {
            let key = service.database_key?;
            let url = v.text(key).unwrap_or(&default).to_string();
            Some((service.name.to_string(), url))
        })
        .collect();
    DatabaseConfigMap {
        default,
        components,
    }
}

fn cache(v: &ValidatedConfig) -> CacheConfig {
    CacheConfig {
        host: v.text("REDIS_HOST").unwrap_or("localhost").to_string(),
        port: v.port("REDIS_PORT").unwrap_or(6379),
        password: v.text("REDIS_PASSWORD").map(str::to_string),
        db: v.number("REDIS_DB").map(|n| n as u8).unwrap_or(0),
        enable_ready_check: false,
        max_retries_per_request: None,
    }
}

fn cors(v: &ValidatedConfig) -> CorsConfig {
    let raw = v.text("CORS_ORIGIN").unwrap_or_default().trim();
    let origin = if raw == "*" {
        CorsOrigin::Any
    } else {
        CorsOrigin::List(
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        )
    };
    CorsConfig {
        origin,
        credentials: true,
    }
}

fn rate_limit(v: &ValidatedConfig) -> RateLimitConfig {
    RateLimitConfig {
        window_ms: v.number("RATE_LIMIT_WINDOW_MS").map(|n| n as u64).unwrap_or(900_000),
        max_requests: v.number("RATE_LIMIT_MAX_REQUESTS").map(|n| n as u64).unwrap_or(100),
        message: RATE_LIMIT_MESSAGE.to_string(),
        standard_headers: true,
        legacy_headers: false,
    }
}
