//! T-SQL preprocessing ahead of `sqlparser`.
//!
//! Scripts are split into `GO` batches and each batch is rewritten so that
//! T-SQL spellings the parser does not accept become equivalent ones it does:
//!
//! | Script | Parsed as |
//! |--------|-----------|
//! | `EXEC(@sql)` | `EXEC sp_executesql(@sql)` |
//! | `ALTER PROCEDURE p` | `CREATE OR ALTER PROCEDURE p` |
//! | `ALTER FUNCTION f` | `CREATE OR ALTER FUNCTION f` |
//! | `CREATE PROC p` | `CREATE PROCEDURE p` |
//!
//! Edit points are located with the `sqlparser` tokenizer, so string
//! literals, comments and quoted identifiers are never touched. Rewrites only
//! ever insert text within a line; every insertion is recorded so positions
//! in the rewritten text can be mapped back to the original script.

use sqlparser::{
    dialect::MsSqlDialect,
    tokenizer::{Location, Token, TokenWithSpan, Tokenizer}
};

/// Procedure name used for parenthesised dynamic execution
const DYNAMIC_EXEC_TARGET: &str = " sp_executesql";

/// A run of statements between `GO` separators
#[derive(Debug, Clone)]
pub struct Batch {
    /// Rewritten batch text handed to the parser
    pub sql:        String,
    /// 1-based script line of the first batch line
    pub start_line: u64,
    insertions:     Vec<Insertion>
}

/// Text inserted at a batch-local position of the original text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Insertion {
    line:   u64,
    column: u64,
    width:  u64
}

impl Batch {
    /// Map a batch-local position of the rewritten text to a script position
    /// of the original text.
    pub fn original_position(&self, line: u64, column: u64) -> (u64, u64) {
        let mut shift = 0;
        for ins in self.insertions.iter().filter(|i| i.line == line) {
            let rewritten_start = ins.column + shift;
            if column >= rewritten_start + ins.width {
                shift += ins.width;
            } else if column >= rewritten_start {
                shift = column - ins.column;
                break;
            } else {
                break;
            }
        }
        (line + self.start_line - 1, column - shift)
    }
}

/// Split a script on `GO` separator lines and rewrite every batch
pub fn preprocess(sql: &str) -> Vec<Batch> {
    split_batches(sql)
        .into_iter()
        .map(|(content, start_line)| rewrite_batch(content, start_line))
        .collect()
}

/// `GO` must stand on its own line; `GO;` is accepted as well
fn split_batches(content: &str) -> Vec<(&str, u64)> {
    let mut batches = Vec::new();
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1;
    let mut batch_start_line = 1;

    for line in content.split_inclusive('\n') {
        let next_pos = current_pos + line.len();
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("go") || trimmed.eq_ignore_ascii_case("go;") {
            if current_pos > batch_start {
                batches.push((&content[batch_start..current_pos], batch_start_line));
            }
            batch_start = next_pos;
            batch_start_line = current_line + 1;
        }
        current_pos = next_pos;
        current_line += 1;
    }

    if batch_start < content.len() {
        batches.push((&content[batch_start..], batch_start_line));
    }
    batches
}

fn rewrite_batch(content: &str, start_line: u64) -> Batch {
    // Tokenizer errors are left for the parser to report
    let Ok(tokens) = Tokenizer::new(&MsSqlDialect {}, content).tokenize_with_location() else {
        return Batch {
            sql: content.to_string(),
            start_line,
            insertions: Vec::new()
        };
    };

    let edits = find_edits(&tokens);
    if edits.is_empty() {
        return Batch {
            sql: content.to_string(),
            start_line,
            insertions: Vec::new()
        };
    }

    let line_starts = line_starts(content);
    let mut positioned: Vec<(usize, &Edit)> = edits
        .iter()
        .filter_map(|edit| byte_offset(content, &line_starts, edit.at).map(|off| (off, edit)))
        .collect();
    positioned.sort_by_key(|(off, _)| *off);

    let mut sql = content.to_string();
    for (offset, edit) in positioned.iter().rev() {
        sql.insert_str(*offset, edit.text);
    }

    let mut insertions: Vec<Insertion> = positioned
        .iter()
        .map(|(_, edit)| Insertion {
            line:   edit.at.line,
            column: edit.at.column,
            width:  edit.text.chars().count() as u64
        })
        .collect();
    insertions.sort_by_key(|i| (i.line, i.column));

    Batch {
        sql,
        start_line,
        insertions
    }
}

#[derive(Debug)]
struct Edit {
    at:   Location,
    text: &'static str
}

fn find_edits(tokens: &[TokenWithSpan]) -> Vec<Edit> {
    let significant: Vec<&TokenWithSpan> = tokens
        .iter()
        .filter(|t| !matches!(t.token, Token::Whitespace(_)))
        .collect();

    let mut edits = Vec::new();
    for (idx, tok) in significant.iter().enumerate() {
        let next = significant.get(idx + 1).map(|t| &t.token);
        let prev = idx.checked_sub(1).map(|i| &significant[i].token);

        if is_word(&tok.token, "EXEC") || is_word(&tok.token, "EXECUTE") {
            if matches!(next, Some(Token::LParen)) {
                edits.push(Edit {
                    at:   tok.span.end,
                    text: DYNAMIC_EXEC_TARGET
                });
            }
        } else if is_word(&tok.token, "ALTER") {
            let alters_routine = next.is_some_and(|t| {
                is_word(t, "PROCEDURE") || is_word(t, "PROC") || is_word(t, "FUNCTION")
            });
            let already_create_or = prev.is_some_and(|t| is_word(t, "OR"));
            if alters_routine && !already_create_or {
                edits.push(Edit {
                    at:   tok.span.start,
                    text: "CREATE OR "
                });
            }
        } else if is_word(&tok.token, "PROC")
            && prev.is_some_and(|t| is_word(t, "CREATE") || is_word(t, "ALTER"))
        {
            edits.push(Edit {
                at:   tok.span.end,
                text: "EDURE"
            });
        }
    }
    edits
}

/// Unquoted word matching `expected` case-insensitively
fn is_word(token: &Token, expected: &str) -> bool {
    match token {
        Token::Word(w) => w.quote_style.is_none() && w.value.eq_ignore_ascii_case(expected),
        _ => false
    }
}

fn line_starts(content: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(content.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

/// Byte offset of a 1-based line/column location (columns count chars)
fn byte_offset(content: &str, line_starts: &[usize], at: Location) -> Option<usize> {
    let line_idx = usize::try_from(at.line).ok()?.checked_sub(1)?;
    let start = *line_starts.get(line_idx)?;
    let col_idx = usize::try_from(at.column).ok()?.checked_sub(1)?;
    let line = &content[start..];
    match line.char_indices().nth(col_idx) {
        Some((off, _)) => Some(start + off),
        None if line.chars().count() == col_idx => Some(content.len()),
        None => None
    }
}
