//! AutoLab Common Library
//!
//! Shared types, configuration, and the scenario catalog for the AutoLab sandbox.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use catalog::{ApiContract, Catalog, Category, Difficulty, Scenario, StyleText};
pub use config::{LabConfig, LatencyConfig, MentorConfig, RecorderConfig};
pub use error::{Error, Result};
pub use types::*;

/// AutoLab version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default store path
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".autolab")
}

/// Default configuration file path
pub fn default_config_path() -> std::path::PathBuf {
    default_store_path().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
