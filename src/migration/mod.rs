// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot migration of legacy per-component configuration.
//!
//! Legacy deployments keep configuration in scattered `.env` files and in
//! config modules that read the process environment. The [`MigrationEngine`]
//! discovers those artifacts, backs them up, merges them in component priority
//! order and writes a single sectioned `.env` at the root.

pub mod discovery;
pub mod engine;
pub mod generator;
pub mod merge;

pub use discovery::{discover, ArtifactKind, LegacyArtifact, COMPONENT_PRIORITY};
pub use engine::{
    validate_unified, ArtifactParseWarning, BackupBundle, MigrationEngine, MigrationReport,
    UnifiedCheck,
};
pub use generator::{generate, render_template};
pub use merge::merge;
