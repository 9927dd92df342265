//! Parser adapter over `sqlparser`'s T-SQL dialect.
//!
//! [`parse_script`] turns a script into its statements, or into every syntax
//! error found, ordered by position. Scripts are preprocessed first (see
//! [`preprocess`]) and all reported positions refer to the original text.
//!
//! # Example
//!
//! ```
//! use tenant_sql::parser::parse_script;
//!
//! let statements = parse_script("SELECT t.Id FROM om.om_table t").unwrap();
//! assert_eq!(statements.len(), 1);
//!
//! let errors = parse_script("SELECT * FROM om.om_table WHERE )").unwrap_err();
//! assert_eq!(errors[0].line, 1);
//! ```

pub mod preprocess;

use std::ops::ControlFlow;

use sqlparser::{
    ast::{Expr, Ident, Statement, visit_expressions},
    dialect::MsSqlDialect,
    parser::Parser
};
use tracing::debug;

use self::preprocess::Batch;
use crate::error::{ParseError, SqlError, extract_position, strip_position};

/// Keywords SQL Server refuses as unquoted identifiers
const RESERVED_IDENTIFIERS: &[&str] = &[
    "ALTER", "CREATE", "DELETE", "DROP", "EXEC", "EXECUTE", "FROM", "GROUP", "HAVING", "INSERT",
    "INTO", "JOIN", "ORDER", "SELECT", "TABLE", "UNION", "UPDATE", "VALUES", "WHERE"
];

/// Parse a T-SQL script.
///
/// # Errors
///
/// Returns every syntax error found, ordered by line and column. Each `GO`
/// batch stops at its first error, so a script yields at most one error per
/// batch from the grammar itself.
pub fn parse_script(sql: &str) -> Result<Vec<Statement>, Vec<ParseError>> {
    let dialect = MsSqlDialect {};
    let mut statements = Vec::new();
    let mut errors = Vec::new();

    for batch in preprocess::preprocess(sql) {
        match Parser::parse_sql(&dialect, &batch.sql) {
            Ok(parsed) => {
                if let Some(err) = find_reserved_identifier(&parsed, &batch) {
                    errors.push(err);
                } else {
                    statements.extend(parsed);
                }
            }
            Err(err) => errors.push(to_parse_error(&err.to_string(), &batch))
        }
    }

    if errors.is_empty() {
        debug!(statements = statements.len(), "parsed script");
        Ok(statements)
    } else {
        errors.sort_by_key(|e| (e.line, e.column));
        debug!(errors = errors.len(), "script failed to parse");
        Err(errors)
    }
}

/// Parse a script, keeping only the first error as a typed failure
///
/// # Errors
///
/// Returns [`SqlError::ParseFailure`] carrying the first syntax error.
pub fn validate_script(sql: &str) -> Result<Vec<Statement>, SqlError> {
    parse_script(sql).map_err(first_failure)
}

fn first_failure(errors: Vec<ParseError>) -> SqlError {
    errors
        .into_iter()
        .next()
        .map(SqlError::from)
        .unwrap_or_else(|| SqlError::ParseFailure {
            line:    1,
            column:  1,
            message: String::from("unknown parse error")
        })
}

fn to_parse_error(message: &str, batch: &Batch) -> ParseError {
    // Errors at end of input carry no position: report the batch end
    let (line, column) = match extract_position(message) {
        Some(pos) => batch.original_position(pos.line, pos.column),
        None => {
            let last_line = batch.sql.lines().count().max(1) as u64;
            let last_col = batch
                .sql
                .lines()
                .last()
                .map_or(1, |l| l.chars().count() as u64 + 1);
            batch.original_position(last_line, last_col)
        }
    };
    let message = strip_position(message);
    ParseError {
        line,
        column,
        message: message
            .strip_prefix("sql parser error: ")
            .unwrap_or(message)
            .to_string()
    }
}

fn find_reserved_identifier(statements: &[Statement], batch: &Batch) -> Option<ParseError> {
    let flow = statements
        .iter()
        .try_for_each(|stmt| visit_expressions(stmt, reserved_identifier));

    match flow {
        ControlFlow::Break(ident) => {
            let start = ident.span.start;
            let (line, column) = batch.original_position(start.line.max(1), start.column.max(1));
            Some(ParseError {
                line,
                column,
                message: format!("Incorrect syntax near the keyword '{}'", ident.value)
            })
        }
        ControlFlow::Continue(()) => None
    }
}

fn reserved_identifier(expr: &Expr) -> ControlFlow<Ident> {
    let idents: &[Ident] = match expr {
        Expr::Identifier(ident) => std::slice::from_ref(ident),
        Expr::CompoundIdentifier(idents) => idents,
        _ => &[]
    };
    match idents.iter().find(|ident| is_reserved(ident)) {
        Some(ident) => ControlFlow::Break(ident.clone()),
        None => ControlFlow::Continue(())
    }
}

fn is_reserved(ident: &Ident) -> bool {
    ident.quote_style.is_none()
        && RESERVED_IDENTIFIERS
            .iter()
            .any(|kw| ident.value.eq_ignore_ascii_case(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_script() {
        let statements = parse_script("SELECT a.Id FROM om.om_a a; SELECT 1").unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_parse_error_has_position() {
        let errors = parse_script("SELECT * FROM om.om_table WHERE )").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[0].column, 33);
        assert!(!errors[0].message.contains("Line:"));
    }

    #[test]
    fn test_reserved_keyword_as_column() {
        let errors = parse_script("SELECT FROM").unwrap_err();
        assert_eq!(errors[0].line, 1);
        assert!(errors[0].column >= 1);
    }

    #[test]
    fn test_quoted_reserved_keyword_is_fine() {
        assert!(parse_script("SELECT [From] FROM om.om_table").is_ok());
    }

    #[test]
    fn test_errors_from_several_batches_are_ordered() {
        let errors = parse_script("SELECT * FROM WHERE )\nGO\nSELECT 1\nGO\nSELECT * FROM x WHERE )")
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 5);
    }

    #[test]
    fn test_validate_script_returns_first_failure() {
        let err = validate_script("SELECT * FROM t WHERE )").unwrap_err();
        assert!(matches!(
            err,
            SqlError::ParseFailure {
                line: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_dynamic_exec_parses() {
        let sql = "DECLARE @sql nvarchar(max) = N'SELECT * FROM om.om_dynamic'; EXEC(@sql);";
        assert!(parse_script(sql).is_ok());
    }
}
