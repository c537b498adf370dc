//! Configuration management for formgate tooling
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (formgate.toml)
//! - Environment variables (FORMGATE__*)
//!
//! ## Example config file (formgate.toml):
//! ```toml
//! [output]
//! format = "compact"
//! group_errors = true
//!
//! [validation]
//! strict = true
//! trim_strings = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::document::SchemaDocument;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormgateConfig {
    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Settings applied to every loaded schema
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON layout of reports
    #[serde(default)]
    pub format: OutputFormat,

    /// Print errors grouped by field instead of as a list
    #[serde(default)]
    pub group_errors: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Validation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Force strict mode on every schema
    #[serde(default)]
    pub strict: bool,

    /// Trim surrounding whitespace from strings on every schema
    #[serde(default)]
    pub trim_strings: bool,
}

impl FormgateConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["formgate.toml", ".formgate.toml", "config/formgate.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "formgate") {
            let xdg_config = config_dir.config_dir().join("formgate.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("FORMGATE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Apply the validation settings to a schema document
    pub fn apply_to(&self, document: &mut SchemaDocument) {
        document.strict |= self.validation.strict;
        document.trim |= self.validation.trim_strings;
    }
}
