//! Filesystem helpers for syncstat
//!
//! Owns everything that lives in the state directory: well-known file
//! names, atomic line-file writes, the advisory run lock, and
//! format-agnostic config loading.

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod lock;

pub use config::ConfigStore;
pub use constants::StatePath;
pub use error::{Error, Result};
pub use lock::RunLock;
