//! Tenant mappings and the stores that supply them.
//!
//! The core only reads mapping snapshots. [`MappingStore`] is the seam to the
//! persistence layer; two stores ship with the crate:
//!
//! - [`InMemoryMappingStore`] holds a fixed list (tests, embedding).
//! - [`FileMappingStore`] reads a TOML, JSON or YAML file on every call.
//!
//! # File Format
//!
//! ```toml
//! [[mappings]]
//! customerId = "0b6c9d55-7f3e-4bd0-9d38-2a4c1f1e9a10"
//! customerCode = "ABC"
//! customerName = "ABC Corp"
//! schemaName = "abc"
//! objectPrefix = "abc_"
//! databaseUser = "abcuser"
//! ```
//!
//! JSON and YAML files hold the same records as a top-level list.
//! `snake_case` keys are accepted as well.

use std::{
    future::Future,
    path::{Path, PathBuf}
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{SqlError, mapping_load_error},
    qualifier::Qualifier
};

/// Per-customer naming convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMapping {
    #[serde(alias = "customer_id")]
    pub customer_id:   Uuid,
    #[serde(alias = "customer_code")]
    pub customer_code: String,
    #[serde(alias = "customer_name", default)]
    pub customer_name: String,
    #[serde(alias = "schema_name")]
    pub schema_name:   String,
    #[serde(alias = "object_prefix")]
    pub object_prefix: String,
    #[serde(alias = "database_user", default)]
    pub database_user: String
}

impl TenantMapping {
    /// The tenant's schema/prefix pair
    pub fn qualifier(&self) -> Qualifier {
        Qualifier::new(self.schema_name.clone(), self.object_prefix.clone())
    }

    pub fn matches_code(&self, code: &str) -> bool {
        self.customer_code.eq_ignore_ascii_case(code.trim())
    }
}

/// Read access to tenant mappings.
///
/// Futures returned by a store are dropped when the caller is cancelled;
/// stores must not leave shared state half-updated at an await point.
pub trait MappingStore: Send + Sync {
    /// Every known mapping, in store order
    fn get_all(&self) -> impl Future<Output = Result<Vec<TenantMapping>, SqlError>> + Send;

    /// The mapping with the given customer code (case-insensitive)
    fn get_by_code(
        &self,
        code: &str
    ) -> impl Future<Output = Result<Option<TenantMapping>, SqlError>> + Send;
}

/// Fixed list of mappings
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    mappings: Vec<TenantMapping>
}

impl InMemoryMappingStore {
    /// # Errors
    ///
    /// Fails when two mappings share a customer code.
    pub fn new(mappings: Vec<TenantMapping>) -> Result<Self, SqlError> {
        ensure_unique_codes(&mappings, "memory")?;
        Ok(Self {
            mappings
        })
    }
}

impl MappingStore for InMemoryMappingStore {
    async fn get_all(&self) -> Result<Vec<TenantMapping>, SqlError> {
        Ok(self.mappings.clone())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<TenantMapping>, SqlError> {
        Ok(self.mappings.iter().find(|m| m.matches_code(code)).cloned())
    }
}

/// Mapping file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    Toml,
    Json,
    Yaml
}

impl MappingFormat {
    /// Detect from a file extension; unknown extensions read as TOML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Toml
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlMappings {
    #[serde(default)]
    mappings: Vec<TenantMapping>
}

/// Mappings read from a file on each call
#[derive(Debug, Clone)]
pub struct FileMappingStore {
    path:   PathBuf,
    format: MappingFormat
}

impl FileMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = MappingFormat::from_path(&path);
        Self {
            path,
            format
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<TenantMapping>, SqlError> {
        let path_display = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| mapping_load_error(&path_display, e))?;
        let mappings = parse_mappings(&content, self.format)
            .map_err(|e| mapping_load_error(&path_display, e))?;
        ensure_unique_codes(&mappings, &path_display)?;
        tracing::debug!(path = %path_display, count = mappings.len(), "loaded tenant mappings");
        Ok(mappings)
    }
}

impl MappingStore for FileMappingStore {
    async fn get_all(&self) -> Result<Vec<TenantMapping>, SqlError> {
        self.load().await
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<TenantMapping>, SqlError> {
        let mappings = self.load().await?;
        Ok(mappings.into_iter().find(|m| m.matches_code(code)))
    }
}

/// Parse mapping records from file content
///
/// # Errors
///
/// Returns the deserializer's message when the content is malformed.
pub fn parse_mappings(content: &str, format: MappingFormat) -> Result<Vec<TenantMapping>, String> {
    match format {
        MappingFormat::Toml => toml::from_str::<TomlMappings>(content)
            .map(|file| file.mappings)
            .map_err(|e| e.to_string()),
        MappingFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        MappingFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())
    }
}

fn ensure_unique_codes(mappings: &[TenantMapping], source: &str) -> Result<(), SqlError> {
    for (idx, mapping) in mappings.iter().enumerate() {
        if mappings[..idx]
            .iter()
            .any(|m| m.matches_code(&mapping.customer_code))
        {
            return Err(mapping_load_error(
                source,
                format!("duplicate customer code '{}'", mapping.customer_code)
            ));
        }
    }
    Ok(())
}
