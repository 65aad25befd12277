//! dockgate-common — Shared error type and configuration used across all dockgate crates.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{GateConfig, RecoveryConfig, ValidationConfig};
pub use error::{GateError, Result};
