//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.tenant-sql.toml` in current directory
//! 4. `~/.config/tenant-sql/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [canonical]
//! schema = "om"
//! prefix = "om_"
//!
//! [mappings]
//! path = "tenants.toml"       # TOML, JSON or YAML
//!
//! [logging]
//! level = "info"              # overridden by RUST_LOG
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `TENANT_SQL_MAPPINGS` | Path of the tenant mapping file |
//! | `TENANT_SQL_CANONICAL_SCHEMA` | Canonical schema name |
//! | `TENANT_SQL_CANONICAL_PREFIX` | Canonical object prefix |

use std::{
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;

use crate::{
    error::{AppResult, config_error},
    qualifier::Qualifier,
    render::{CANONICAL_PREFIX, CANONICAL_SCHEMA}
};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub canonical: CanonicalConfig,
    #[serde(default)]
    pub mappings:  MappingsConfig,
    #[serde(default)]
    pub logging:   LoggingConfig
}

/// Canonical qualifier used for stored scripts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    pub schema: String,
    pub prefix: String
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            schema: String::from(CANONICAL_SCHEMA),
            prefix: String::from(CANONICAL_PREFIX)
        }
    }
}

impl CanonicalConfig {
    pub fn qualifier(&self) -> Qualifier {
        Qualifier::new(self.schema.clone(), self.prefix.clone())
    }
}

/// Tenant mapping source
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MappingsConfig {
    pub path: Option<PathBuf>
}

/// Log verbosity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("warn")
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.tenant-sql.toml)
    /// 3. Config file in home directory (~/.config/tenant-sql/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("tenant-sql")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        // Local config overrides the home config
        let local_config = PathBuf::from(".tenant-sql.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Read a single config file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        toml::from_str(&content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override values from environment variables
    pub fn apply_env(&mut self) {
        if let Ok(path) = env::var("TENANT_SQL_MAPPINGS") {
            self.mappings.path = Some(PathBuf::from(path));
        }
        if let Ok(schema) = env::var("TENANT_SQL_CANONICAL_SCHEMA") {
            self.canonical.schema = schema;
        }
        if let Ok(prefix) = env::var("TENANT_SQL_CANONICAL_PREFIX") {
            self.canonical.prefix = prefix;
        }
    }

    /// The canonical qualifier must be usable as a rewrite source
    pub fn validate(&self) -> AppResult<()> {
        if !self.canonical.qualifier().is_complete() {
            return Err(config_error(
                "Canonical schema and prefix must both be non-empty"
            ));
        }
        Ok(())
    }
}
