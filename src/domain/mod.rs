// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core business logic and types.
//!
//! This module contains the core domain types for the configuration crate:
//! keys and values, the declared schema, tiers, snapshots and the error
//! taxonomy. It is independent of any I/O.

pub mod config_key;
pub mod config_value;
pub mod env_map;
pub mod errors;
pub mod schema;
pub mod service;
pub mod snapshot;
pub mod tier;

// Re-export commonly used types
pub use config_key::ConfigKey;
pub use config_value::ConfigValue;
pub use env_map::EnvMap;
pub use errors::{ConfigError, FieldViolation, Result};
pub use service::{ConfigurationService, ServiceConfig, ServiceDescriptor, SERVICES};
pub use snapshot::{
    CacheConfig, ConfigSnapshot, CorsConfig, CorsOrigin, DatabaseConfigMap, DerivedConfig,
    RateLimitConfig, ServiceUrlMap, ValidatedConfig,
};
pub use tier::Tier;
