pub use masterror::{AppError, AppResult};

/// Syntax error reported by the parser adapter.
///
/// Positions are 1-based and always refer to the original script text, even
/// when the adapter rewrote parts of it before parsing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParseError {
    pub line:    u64,
    pub column:  u64,
    pub message: String
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

/// Typed failures of the analysis core
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SqlError {
    /// Malformed SQL; never retried
    #[error("SQL parse error at line {line}, column {column}: {message}")]
    ParseFailure {
        line:    u64,
        column:  u64,
        message: String
    },
    /// Render requested for a tenant the mapping store does not know
    #[error("no tenant mapping found for customer code '{customer_code}'")]
    MappingNotFound { customer_code: String },
    /// The tenant's mapping lacks a schema name or object prefix
    #[error("tenant mapping for customer code '{customer_code}' lacks schema or prefix")]
    IncompleteMapping { customer_code: String },
    /// The mapping collaborator could not produce its data
    #[error("mapping store error: {0}")]
    MappingStore(String)
}

impl From<ParseError> for SqlError {
    fn from(err: ParseError) -> Self {
        Self::ParseFailure {
            line:    err.line,
            column:  err.column,
            message: err.message
        }
    }
}

impl From<SqlError> for AppError {
    fn from(err: SqlError) -> Self {
        match err {
            SqlError::ParseFailure {
                ..
            } => AppError::bad_request(err.to_string()),
            SqlError::MappingNotFound {
                ..
            } => AppError::not_found(err.to_string()),
            SqlError::IncompleteMapping {
                ..
            } => AppError::bad_request(err.to_string()),
            SqlError::MappingStore(_) => AppError::service(err.to_string())
        }
    }
}

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create mapping file error
pub fn mapping_load_error(path: &str, message: impl std::fmt::Display) -> SqlError {
    SqlError::MappingStore(format!("Failed to load mappings from '{}': {}", path, message))
}

/// Create output serialization error
pub fn output_error(message: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("Failed to format output: {}", message))
}

/// Position of a syntax error inside a `sqlparser` error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SqlPosition {
    pub line:   u64,
    pub column: u64
}

/// Extract the `Line: X, Column: Y` suffix that `sqlparser` appends to its
/// errors. Older releases omitted the colon after `Column`.
pub(crate) fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let line_start = message.rfind(line_marker)? + line_marker.len();
    let rest = &message[line_start..];
    let line_end = rest.find(|c: char| !c.is_ascii_digit())?;
    let line = rest[..line_end].parse().ok()?;

    let rest = rest[line_end..].strip_prefix(", Column")?;
    let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
    let col_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let column = rest[..col_end].parse().ok()?;

    Some(SqlPosition {
        line,
        column
    })
}

/// Drop the trailing position suffix, keeping the parser's description
pub(crate) fn strip_position(message: &str) -> &str {
    match message.rfind(" at Line: ") {
        Some(idx) => &message[..idx],
        None => message
    }
}
