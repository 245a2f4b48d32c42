//! cloudinfra-common - Shared types and constants
//!
//! This crate holds the vocabulary shared by the synthesizer and its tests,
//! without any AWS SDK dependencies to keep it lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values and fixed resource settings
//! - [`resource_kind`]: Closed catalog of resource kinds with scope and naming token
//! - [`tags`]: Stack tag schema applied to every synthesized resource

pub mod defaults;
pub mod resource_kind;
pub mod tags;

// Re-export commonly used types
pub use resource_kind::{RegionScope, ResourceKind};
