//! Schema/prefix qualifier rewriting.
//!
//! Pure text substitution; callers gate it on a successful parse. Two
//! patterns are supported:
//!
//! | Pattern | Matches | Becomes |
//! |---------|---------|---------|
//! | [`SchemaPrefix`] | `[abc].[abc_`, `abc . abc_` | `[om].[om_`, `om.om_` |
//! | [`UserNamespace`] | `dbuser.dbuser_` | `om.om_` |
//!
//! Matching is case-insensitive and the qualifier must start on a word
//! boundary. Schema, prefix and user are trimmed. A rewrite whose source or
//! target schema, prefix or user is empty is a no-op.
//!
//! # Example
//!
//! ```
//! use tenant_sql::qualifier::{Qualifier, SchemaPrefix};
//!
//! let rewrite = SchemaPrefix::new(&Qualifier::new("abc", "abc_"), &Qualifier::new("om", "om_"));
//! assert_eq!(
//!     rewrite.apply("SELECT * FROM [abc].[abc_table]"),
//!     "SELECT * FROM [om].[om_table]"
//! );
//! ```

use std::borrow::Cow;

use regex::{Captures, Regex, RegexBuilder};

/// A schema name paired with the prefix its objects carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    pub schema: String,
    pub prefix: String
}

impl Qualifier {
    pub fn new(schema: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            prefix: prefix.into()
        }
    }

    /// Both parts are non-empty
    pub fn is_complete(&self) -> bool {
        !self.schema.trim().is_empty() && !self.prefix.trim().is_empty()
    }

    fn trimmed(&self) -> Self {
        Self::new(self.schema.trim(), self.prefix.trim())
    }
}

/// Rewrites `schema.prefix` (optionally bracketed) into another qualifier
#[derive(Debug, Clone)]
pub struct SchemaPrefix {
    pattern: Option<Regex>,
    target:  Qualifier
}

impl SchemaPrefix {
    pub fn new(source: &Qualifier, target: &Qualifier) -> Self {
        let source = source.trimmed();
        let target = target.trimmed();
        let pattern = (source.is_complete() && target.is_complete()).then(|| {
            let expr = format!(
                r"(\[)?\b{schema}(\])?\s*\.\s*(\[)?{prefix}",
                schema = regex::escape(&source.schema),
                prefix = regex::escape(&source.prefix)
            );
            case_insensitive(&expr)
        });
        Self {
            pattern: pattern.flatten(),
            target
        }
    }

    /// The rewrite changes nothing
    pub fn is_noop(&self) -> bool {
        self.pattern.is_none()
    }

    pub fn apply<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        let Some(pattern) = &self.pattern else {
            return Cow::Borrowed(sql);
        };
        pattern.replace_all(sql, |caps: &Captures<'_>| {
            let open = caps.get(1).map_or("", |m| m.as_str());
            let close = caps.get(2).map_or("", |m| m.as_str());
            let prefix_open = caps.get(3).map_or("", |m| m.as_str());
            format!(
                "{open}{}{close}.{prefix_open}{}",
                self.target.schema, self.target.prefix
            )
        })
    }
}

/// Rewrites `user.user_` (a database user used as namespace and prefix)
/// into a qualifier
#[derive(Debug, Clone)]
pub struct UserNamespace {
    pattern:     Option<Regex>,
    replacement: String
}

impl UserNamespace {
    pub fn new(user: &str, target: &Qualifier) -> Self {
        let user = user.trim();
        let target = target.trimmed();
        let pattern = if user.is_empty() || !target.is_complete() {
            None
        } else {
            let user = regex::escape(user);
            case_insensitive(&format!(r"\b{user}\.{user}_"))
        };
        Self {
            pattern,
            replacement: format!("{}.{}", target.schema, target.prefix)
        }
    }

    pub fn apply<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(sql, regex::NoExpand(&self.replacement)),
            None => Cow::Borrowed(sql)
        }
    }
}

fn case_insensitive(expr: &str) -> Option<Regex> {
    RegexBuilder::new(expr).case_insensitive(true).build().ok()
}
