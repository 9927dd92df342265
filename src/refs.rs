//! Object reference extraction.
//!
//! Walks parsed T-SQL and reports every schema-qualified table, view,
//! procedure, function and column a script touches.
//!
//! # Resolution rules
//!
//! - `FROM`/`JOIN` tables with a `schema.table` name are reported as
//!   [`ObjectKind::Table`] and registered under their bare name, their
//!   qualified name and their alias in the current scope frame.
//! - Table-valued functions are reported as [`ObjectKind::Function`] and are
//!   not registered.
//! - `alias.column` resolves through the scope frames, innermost first;
//!   unresolvable references are dropped. `schema.table.column` is reported
//!   as written.
//! - Single-part names (CTEs, temp tables, table variables) are never
//!   reported, and string literals are never looked into, so dynamic SQL does
//!   not contribute references.
//!
//! # Example
//!
//! ```
//! use tenant_sql::refs::{ObjectKind, extract_references};
//!
//! let refs = extract_references(
//!     "WITH cte AS (SELECT t.Id FROM om.om_table t) \
//!      SELECT cte.Id FROM cte JOIN om.om_other o ON o.Id = cte.Id"
//! )
//! .unwrap();
//!
//! assert!(refs.iter().any(|r| r.name == "om.om_table" && r.kind == ObjectKind::Table));
//! assert!(refs.iter().all(|r| !r.name.contains("cte")));
//! ```

mod dedup;
mod scope;
mod types;
mod visitor;

use rayon::prelude::*;
use sqlparser::ast::{Statement, Visit};
use tracing::debug;

pub use self::{
    dedup::deduplicate,
    scope::{QualifiedTable, ScopeStack},
    types::{ObjectKind, ObjectReference},
    visitor::{ReferenceVisitor, name_parts, qualify}
};
use crate::{error::SqlError, parser::validate_script};

/// Parse a script and return its sorted, distinct object references.
///
/// # Errors
///
/// Returns [`SqlError::ParseFailure`] with the first syntax error; extraction
/// never runs on a script that failed to parse.
pub fn extract_references(sql: &str) -> Result<Vec<ObjectReference>, SqlError> {
    let statements = validate_script(sql)?;
    let refs = deduplicate(collect_references(&statements));
    debug!(references = refs.len(), "extracted references");
    Ok(refs)
}

/// Raw references of already parsed statements, in visiting order and with
/// duplicates.
pub fn collect_references(statements: &[Statement]) -> Vec<ObjectReference> {
    let mut visitor = ReferenceVisitor::new();
    for statement in statements {
        let _ = statement.visit(&mut visitor);
    }
    visitor.into_references()
}

/// Extract references from several scripts in parallel, preserving order
pub fn extract_many<S>(scripts: &[S]) -> Vec<Result<Vec<ObjectReference>, SqlError>>
where
    S: AsRef<str> + Sync
{
    scripts
        .par_iter()
        .map(|sql| extract_references(sql.as_ref()))
        .collect()
}
