use colored::Colorize;
use serde::Serialize;

use crate::{
    error::{AppResult, ParseError, output_error},
    refs::{ObjectKind, ObjectReference}
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// References of one script
#[derive(Debug, Serialize)]
pub struct ScriptReferences<'a> {
    pub source:     &'a str,
    pub references: &'a [ObjectReference]
}

/// Result of validating one script
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub source: &'a str,
    pub valid:  bool,
    pub errors: &'a [ParseError]
}

/// Rewritten script
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_code: Option<&'a str>,
    pub sql:           &'a str
}

fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(output_error),
        _ => serde_json::to_string_pretty(value).map_err(output_error)
    }
}

/// Format references of several scripts
pub fn format_references(
    scripts: &[ScriptReferences<'_>],
    opts: &OutputOptions
) -> AppResult<String> {
    match opts.format {
        OutputFormat::Text => Ok(format_references_text(scripts, opts)),
        format => serialize(&scripts, format)
    }
}

fn format_references_text(scripts: &[ScriptReferences<'_>], opts: &OutputOptions) -> String {
    let mut out = String::new();
    for script in scripts {
        if scripts.len() > 1 {
            let header = format!("== {} ==", script.source);
            out.push_str(&paint(&header, opts, |s| s.bold().to_string()));
            out.push('\n');
        }
        if script.references.is_empty() {
            out.push_str("(no references)\n");
            continue;
        }
        let width = script
            .references
            .iter()
            .map(|r| r.kind.to_string().len())
            .max()
            .unwrap_or(0);
        for reference in script.references {
            let kind = format!("{:<width$}", reference.kind.to_string());
            out.push_str(&paint(&kind, opts, |s| color_kind(s, reference.kind)));
            out.push_str("  ");
            out.push_str(&reference.name);
            out.push('\n');
        }
    }
    out
}

fn color_kind(text: &str, kind: ObjectKind) -> String {
    match kind {
        ObjectKind::Table => text.cyan().to_string(),
        ObjectKind::View => text.blue().to_string(),
        ObjectKind::Procedure | ObjectKind::Function => text.magenta().to_string(),
        ObjectKind::Column => text.dimmed().to_string(),
        _ => text.yellow().to_string()
    }
}

/// Format a validation result
pub fn format_validation(
    report: &ValidationReport<'_>,
    opts: &OutputOptions
) -> AppResult<String> {
    if opts.format != OutputFormat::Text {
        return serialize(report, opts.format);
    }
    if report.valid {
        return Ok(format!(
            "{}: {}\n",
            report.source,
            paint("OK", opts, |s| s.green().to_string())
        ));
    }
    let mut out = String::new();
    for err in report.errors {
        out.push_str(&format!(
            "{}:{}:{}: {} {}\n",
            report.source,
            err.line,
            err.column,
            paint("error:", opts, |s| s.red().bold().to_string()),
            err.message
        ));
    }
    Ok(out)
}

/// Format a rewritten script; text output is the bare SQL
pub fn format_rewrite(output: &RewriteOutput<'_>, opts: &OutputOptions) -> AppResult<String> {
    match opts.format {
        OutputFormat::Text => Ok(output.sql.to_string()),
        format => serialize(output, format)
    }
}

fn paint(text: &str, opts: &OutputOptions, style: impl Fn(&str) -> String) -> String {
    if opts.colored {
        style(text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> OutputOptions {
        OutputOptions {
            format:  OutputFormat::Text,
            colored: false
        }
    }

    #[test]
    fn test_text_references_aligned() {
        let refs = vec![
            ObjectReference::new("om.om_a", ObjectKind::Table),
            ObjectReference::new("om.om_a.Id", ObjectKind::Column),
        ];
        let scripts = [ScriptReferences {
            source:     "a.sql",
            references: &refs
        }];
        let text = format_references(&scripts, &plain()).unwrap();
        assert_eq!(text, "Table   om.om_a\nColumn  om.om_a.Id\n");
    }

    #[test]
    fn test_json_references() {
        let refs = vec![ObjectReference::new("om.om_a", ObjectKind::View)];
        let scripts = [ScriptReferences {
            source:     "a.sql",
            references: &refs
        }];
        let opts = OutputOptions {
            format:  OutputFormat::Json,
            colored: false
        };
        let json = format_references(&scripts, &opts).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["references"][0]["kind"], "View");
    }

    #[test]
    fn test_validation_error_text() {
        let errors = vec![ParseError {
            line:    2,
            column:  5,
            message: "Expected: an expression, found: )".into()
        }];
        let report = ValidationReport {
            source: "q.sql",
            valid:  false,
            errors: &errors
        };
        let text = format_validation(&report, &plain()).unwrap();
        assert!(text.starts_with("q.sql:2:5: error:"));
    }

    #[test]
    fn test_rewrite_json_has_customer_code() {
        let output = RewriteOutput {
            customer_code: Some("ABC"),
            sql:           "SELECT 1"
        };
        let opts = OutputOptions {
            format:  OutputFormat::Json,
            colored: false
        };
        let json = format_rewrite(&output, &opts).unwrap();
        assert!(json.contains("\"customerCode\": \"ABC\""));
    }
}
