// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the configuration authority.
//!
//! The authority composes the schema validator and the deriver over the
//! configured sources, publishes snapshots, and notifies listeners.

pub mod authority;
pub mod deriver;
pub mod events;
pub mod validator;

// Re-export commonly used types
pub use authority::{AuthorityState, ConfigAuthority, ConfigAuthorityBuilder};
pub use deriver::derive;
pub use events::{ConfigEvent, ConfigEventKind, EventBus, EventHandler};
pub use validator::SchemaValidator;
