// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing configuration source implementations.
//!
//! This module contains concrete implementations of the traits defined in the
//! ports layer: the process environment and env-style files as sources, the
//! env-style and source-reference parsers, and the polling file watcher.

pub mod env_file;
pub mod env_var;
pub mod source_ref;

pub mod watchers;

pub use env_file::{set_key, EnvFileAdapter, EnvFileParser, SetOutcome};
pub use env_var::EnvVarAdapter;
pub use source_ref::SourceReferenceParser;
#[cfg(feature = "reload")]
pub use watchers::FileWatcher;
