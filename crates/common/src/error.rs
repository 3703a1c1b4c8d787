//! Error types for AutoLab

use thiserror::Error;

/// Result type alias using the AutoLab error
pub type Result<T> = std::result::Result<T, Error>;

/// AutoLab error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Compile error at line {line}, column {column}: {message}")]
    Compile {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Execution Error: {0}")]
    Execution(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Scenario {scenario} does not support the {style} API style")]
    UnsupportedStyle { scenario: String, style: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl Error {
    /// True for failures raised by learner code rather than by the lab itself
    pub fn is_learner_fault(&self) -> bool {
        matches!(self, Error::Compile { .. } | Error::Execution(_))
    }
}
