//! Configuration management for ptool
//!
//! Configuration is stored in TOML format. Only presentation defaults live
//! here: the envelope and receipt wire constants are never configurable.
//!
//! # Where the file lives
//!
//! - Linux: `~/.config/ptool/ptool.toml`
//! - macOS: `~/Library/Application Support/net.privateness.ptool/ptool.toml`
//! - Windows: `%APPDATA%\privateness\ptool\config\ptool.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ptool_crypto::keyfile::{
    validate_field_path, ED25519_PRIVATE_FIELD, ED25519_PUBLIC_FIELD, X25519_PRIVATE_FIELD,
    X25519_PUBLIC_FIELD,
};

use crate::output::OutputFormat;

/// Errors loading `ptool.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("config rejected: {0}")]
    ValidationError(String),
}

/// ptool configuration
///
/// # Example TOML
///
/// ```toml
/// [keys]
/// x25519_private = "x25519.private"
/// x25519_public = "x25519.public"
/// ed25519_private = "ed25519.private"
/// ed25519_public = "ed25519.public"
///
/// [output]
/// format = "table"  # "table" | "json" | "quiet"
///
/// [logging]
/// level = "warn"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default keyfile dot-paths
    #[serde(default)]
    pub keys: KeysConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dot-paths used when a keyfile is given without an explicit `--*-field`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_x25519_private")]
    pub x25519_private: String,
    #[serde(default = "default_x25519_public")]
    pub x25519_public: String,
    #[serde(default = "default_ed25519_private")]
    pub ed25519_private: String,
    #[serde(default = "default_ed25519_public")]
    pub ed25519_public: String,
}

fn default_x25519_private() -> String {
    X25519_PRIVATE_FIELD.to_string()
}

fn default_x25519_public() -> String {
    X25519_PUBLIC_FIELD.to_string()
}

fn default_ed25519_private() -> String {
    ED25519_PRIVATE_FIELD.to_string()
}

fn default_ed25519_public() -> String {
    ED25519_PUBLIC_FIELD.to_string()
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            x25519_private: default_x25519_private(),
            x25519_public: default_x25519_public(),
            ed25519_private: default_ed25519_private(),
            ed25519_public: default_ed25519_public(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "table", "json", "quiet"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Values given on the command line, which take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_format: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    /// Read and validate one TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The platform config file when it exists, defaults otherwise
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// An explicit `--config` path must exist; the default location need not
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = custom_path {
            Self::load(path)
        } else {
            Self::load_default()
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("net", "privateness", "ptool")
            .map(|dirs| dirs.config_dir().join("ptool.toml"))
    }

    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(format) = &overrides.output_format {
            self.output.format = format.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        self
    }

    /// Resolved output format (table if the configured value is unknown)
    pub fn output_format(&self) -> OutputFormat {
        self.output.format.parse().unwrap_or_default()
    }

    /// Reject unknown formats and levels, and malformed key field paths
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.format.parse::<OutputFormat>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be table, json or quiet (got '{}')",
                self.output.format
            )));
        }

        const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {LEVELS:?} (got '{}')",
                self.logging.level
            )));
        }

        for field in [
            &self.keys.x25519_private,
            &self.keys.x25519_public,
            &self.keys.ed25519_private,
            &self.keys.ed25519_public,
        ] {
            validate_field_path(field)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }
}
