// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! These traits define the interfaces between the authority and the outside
//! world: where raw configuration comes from, how artifacts are parsed, and how
//! changes are detected. Adapters implement them.

pub mod parser;
pub mod source;
pub mod watcher;

// Re-export commonly used types
pub use parser::ConfigParser;
pub use source::ConfigSource;
pub use watcher::{ChangeCallback, ConfigWatcher};
