//! Error types for schema construction and loading
//!
//! These are failures of the *schema*, not of the data being validated.
//! Data failures are collected as [`crate::report::ValidationError`] values
//! and never surface as `Err`.

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Schema definition and loading errors
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Field name must not be empty")]
    EmptyPath,

    #[error("Field name '{name}' contains an empty path segment")]
    EmptySegment { name: String },

    #[error("Field '{field}' requests type coercion but its type cannot coerce")]
    CoercionUnavailable { field: String },

    #[error("Field '{field}' cannot have a default value and be required")]
    DefaultOnRequired { field: String },

    #[error("Field '{field}' cannot have a default value on a wildcard path")]
    DefaultOnWildcard { field: String },

    #[error("Unsupported schema document format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
