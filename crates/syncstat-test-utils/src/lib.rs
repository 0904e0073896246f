//! Shared test utilities for the syncstat workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder for directory trees with controlled mtimes

pub mod tree;

pub use tree::TestTree;
