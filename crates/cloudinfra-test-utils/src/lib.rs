//! Shared test utilities for cloudinfra
//!
//! This crate provides fixtures used by the synthesizer's integration tests
//! without depending on the synthesizer itself.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection for live tests
//! - [`fixtures`]: Profile text, application lists and lookup-cache files

pub mod aws;
pub mod fixtures;

// Re-export commonly used items
pub use aws::get_test_region;
pub use fixtures::{FixtureTree, TEST_ACCOUNT};
