// SPDX-License-Identifier: MIT OR Apache-2.0

//! A unified configuration authority for multi-service deployments.
//!
//! This crate validates the process configuration against a declared schema,
//! derives computed groups (service URLs, connection strings, cache, CORS and
//! rate limiting), publishes immutable snapshots, and reloads them when the
//! backing files change. It also migrates legacy per-component configuration
//! into one sectioned `.env` file.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Core types and rules (`Tier`, `EnvMap`, the schema, snapshots, errors)
//! - **Ports**: Trait definitions that define interfaces (`ConfigSource`, `ConfigParser`, `ConfigWatcher`)
//! - **Adapters**: Process environment and env-file sources, parsers, the polling file watcher
//! - **Service**: The validator, the deriver and the [`ConfigAuthority`](service::ConfigAuthority)
//! - **Migration**: Discovery, backup, merge and generation of the unified artifact
//! - **Report**: Health documents built from a snapshot
//!
//! # Feature Flags
//!
//! - `yaml`: Enable YAML output for health reports (default)
//! - `cli`: Build the `unicfg` binary (default)
//! - `reload`: Enable file watching and hot reload (default)
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use unicfg::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let authority = Arc::new(
//!     ConfigAuthority::builder()
//!         .with_env_file(".env")?
//!         .with_env_vars()
//!         .build(),
//! );
//! authority.load()?;
//!
//! let chat = authority.service_config("chat")?;
//! println!("chat listens on {:?}", chat.port);
//!
//! authority.on(ConfigEventKind::Changed, |event| {
//!     if let ConfigEvent::Changed(snapshot) = event {
//!         println!("reloaded for {}", snapshot.tier());
//!     }
//! });
//! # #[cfg(feature = "reload")]
//! authority.watch()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Migration
//!
//! ```rust,no_run
//! use unicfg::migration::MigrationEngine;
//!
//! # fn main() -> unicfg::domain::Result<()> {
//! let report = MigrationEngine::new(".").migrate()?;
//! println!("merged {} keys from {} files", report.keys.len(), report.migrated_files.len());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod migration;
pub mod ports;
pub mod report;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        ConfigError, ConfigKey, ConfigSnapshot, ConfigValue, ConfigurationService, EnvMap,
        Result, ServiceConfig, Tier,
    };
    pub use crate::ports::{ConfigParser, ConfigSource, ConfigWatcher};

    pub use crate::adapters::{EnvFileAdapter, EnvFileParser, EnvVarAdapter};
    #[cfg(feature = "reload")]
    pub use crate::adapters::FileWatcher;
    pub use crate::migration::MigrationEngine;
    pub use crate::report::{generate_report, HealthReport};
    pub use crate::service::{ConfigAuthority, ConfigEvent, ConfigEventKind, SchemaValidator};
}
