//! Normalize and render orchestration.
//!
//! [`ScriptRenderer`] ties the parser gate, the mapping store and the
//! qualifier rewrites together:
//!
//! ```text
//! tenant SQL ──normalize_for_storage──▶ canonical SQL (om.om_*)
//! canonical SQL ──render_for_customer──▶ tenant SQL
//! ```
//!
//! Both entry points await the store first and transform afterwards, so a
//! dropped (cancelled) call has done no work a caller could observe.
//!
//! # Example
//!
//! ```
//! use tenant_sql::{
//!     mapping::{InMemoryMappingStore, TenantMapping},
//!     render::ScriptRenderer
//! };
//!
//! # tokio_test_block(async {
//! let store = InMemoryMappingStore::new(vec![TenantMapping {
//!     customer_id:   uuid::Uuid::nil(),
//!     customer_code: "ABC".into(),
//!     customer_name: "ABC Corp".into(),
//!     schema_name:   "abc".into(),
//!     object_prefix: "abc_".into(),
//!     database_user: String::new()
//! }])
//! .unwrap();
//! let renderer = ScriptRenderer::new(store);
//!
//! let stored = renderer
//!     .normalize_for_storage("SELECT * FROM [abc].[abc_table]")
//!     .await
//!     .unwrap();
//! assert_eq!(stored, "SELECT * FROM [om].[om_table]");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::SqlError,
    mapping::MappingStore,
    parser::validate_script,
    qualifier::{Qualifier, SchemaPrefix, UserNamespace},
    refs::{ObjectReference, extract_references}
};

/// Schema of stored scripts
pub const CANONICAL_SCHEMA: &str = "om";
/// Object prefix of stored scripts
pub const CANONICAL_PREFIX: &str = "om_";

/// Body of `POST /render/{customerCode}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub sql: String
}

/// Response of `POST /render/{customerCode}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub customer_code: String,
    pub rendered_sql:  String
}

/// Drives normalization and rendering against a mapping store
#[derive(Debug, Clone)]
pub struct ScriptRenderer<S> {
    store:     S,
    canonical: Qualifier
}

impl<S: MappingStore> ScriptRenderer<S> {
    /// Renderer using the `om`/`om_` canonical form
    pub fn new(store: S) -> Self {
        Self::with_canonical(store, Qualifier::new(CANONICAL_SCHEMA, CANONICAL_PREFIX))
    }

    pub fn with_canonical(store: S, canonical: Qualifier) -> Self {
        Self {
            store,
            canonical
        }
    }

    pub fn canonical(&self) -> &Qualifier {
        &self.canonical
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check that a script parses
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ParseFailure`] with the first syntax error.
    pub fn validate(&self, sql: &str) -> Result<(), SqlError> {
        validate_script(sql).map(|_| ())
    }

    /// Sorted, distinct object references of a script
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ParseFailure`] when the script does not parse.
    pub fn extract_references(&self, sql: &str) -> Result<Vec<ObjectReference>, SqlError> {
        extract_references(sql)
    }

    /// Rewrite every tenant's qualifiers into the canonical form.
    ///
    /// Mappings are applied in store order, each rewrite working on the
    /// output of the previous one: first the schema/prefix pattern, then the
    /// database-user pattern.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ParseFailure`] when the script does not parse and
    /// [`SqlError::MappingStore`] when the store fails.
    pub async fn normalize_for_storage(&self, sql: &str) -> Result<String, SqlError> {
        self.validate(sql)?;
        let mappings = self.store.get_all().await?;
        if mappings.is_empty() {
            debug!("no tenant mappings, script stored unchanged");
            return Ok(sql.to_string());
        }

        let mut normalized = sql.to_string();
        for mapping in &mappings {
            let schema_prefix = SchemaPrefix::new(&mapping.qualifier(), &self.canonical);
            normalized = schema_prefix.apply(&normalized).into_owned();
            let user = UserNamespace::new(&mapping.database_user, &self.canonical);
            normalized = user.apply(&normalized).into_owned();
        }

        if normalized != sql {
            info!(mappings = mappings.len(), "normalized script qualifiers");
        }
        Ok(normalized)
    }

    /// Rewrite canonical qualifiers into one tenant's schema/prefix.
    ///
    /// A blank customer code returns the script unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::MappingNotFound`] for an unknown customer code,
    /// [`SqlError::IncompleteMapping`] when the tenant's schema or prefix is
    /// blank, [`SqlError::ParseFailure`] when the script does not parse and
    /// [`SqlError::MappingStore`] when the store fails.
    pub async fn render_for_customer(
        &self,
        sql: &str,
        customer_code: &str
    ) -> Result<String, SqlError> {
        let code = customer_code.trim();
        if code.is_empty() {
            return Ok(sql.to_string());
        }

        let mapping = self.store.get_by_code(code).await?.ok_or_else(|| {
            SqlError::MappingNotFound {
                customer_code: code.to_string()
            }
        })?;
        if !mapping.qualifier().is_complete() {
            return Err(SqlError::IncompleteMapping {
                customer_code: mapping.customer_code
            });
        }
        self.validate(sql)?;

        let rewrite = SchemaPrefix::new(&self.canonical, &mapping.qualifier());
        let rendered = rewrite.apply(sql).into_owned();
        info!(customer = %mapping.customer_code, "rendered script for customer");
        Ok(rendered)
    }

    /// Handle a render request in the shape of the HTTP boundary
    ///
    /// # Errors
    ///
    /// Same as [`ScriptRenderer::render_for_customer`].
    pub async fn render_request(
        &self,
        customer_code: &str,
        request: RenderRequest
    ) -> Result<RenderResponse, SqlError> {
        let rendered_sql = self.render_for_customer(&request.sql, customer_code).await?;
        Ok(RenderResponse {
            customer_code: customer_code.to_string(),
            rendered_sql
        })
    }
}
