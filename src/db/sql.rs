//! Dialect-aware SQL text generation for the bulk helpers.
//!
//! Only identifiers and placeholders are ever spliced into SQL text; every
//! value travels as a bound parameter.

use crate::db::value::SqlValue;
use crate::error::LedgerError;

/// Token a caller places in an UPSERT template where the multi-row
/// `(...), (...)` list should go.
pub const VALUES_MARKER: &str = "{values}";

/// Both supported engines cap a single statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::MySql => "?".to_string(),
        }
    }

    /// `(p1, p2, ...), (...)` for `rows` tuples of `width` parameters.
    pub fn values_list(self, rows: usize, width: usize) -> String {
        let mut groups = Vec::with_capacity(rows);
        let mut next = 1;
        for _ in 0..rows {
            let slots: Vec<String> = (next..next + width).map(|i| self.placeholder(i)).collect();
            next += width;
            groups.push(format!("({})", slots.join(", ")));
        }
        groups.join(", ")
    }

    /// Whether `sql` has a bind placeholder outside quoted literals and
    /// quoted identifiers.
    fn has_own_placeholders(self, sql: &str) -> bool {
        let bare = blank_quoted(sql, self == Dialect::MySql);
        match self {
            Dialect::Postgres => bare
                .as_bytes()
                .windows(2)
                .any(|w| w[0] == b'$' && w[1].is_ascii_digit()),
            Dialect::MySql => bare.contains('?'),
        }
    }
}

/// `sql` with the contents of `'...'`, `"..."` and `` `...` `` replaced by
/// spaces. Doubled quotes stay inside the literal, as do backslash escapes
/// when `backslash_escapes` is set (MySQL).
fn blank_quoted(sql: &str, backslash_escapes: bool) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in sql.chars() {
        match quote {
            None => {
                if matches!(c, '\'' | '"' | '`') {
                    quote = Some(c);
                }
                out.push(c);
            }
            Some(q) => {
                if escaped {
                    escaped = false;
                    out.push(' ');
                } else if backslash_escapes && c == '\\' && q != '`' {
                    escaped = true;
                    out.push(' ');
                } else if c == q {
                    // A doubled quote closes and immediately reopens.
                    quote = None;
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
        }
    }
    out
}

/// One parameterized statement ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Accepts `name` or `schema.name` made of ASCII letters, digits and `_`.
pub fn validate_identifier(ident: &str) -> Result<(), LedgerError> {
    let parts: Vec<&str> = ident.split('.').collect();
    let ok = parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if ok {
        Ok(())
    } else {
        Err(LedgerError::InvalidStatement(format!(
            "`{ident}` is not a plain SQL identifier"
        )))
    }
}

/// Multi-row `INSERT` statements covering `rows`, split into pages.
/// Empty input yields no statements.
pub fn insert_statements(
    dialect: Dialect,
    table: &str,
    columns: &[&str],
    rows: &[Vec<SqlValue>],
    page_size: usize,
) -> Result<Vec<Statement>, LedgerError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    validate_identifier(table)?;
    if columns.is_empty() {
        return Err(LedgerError::InvalidStatement(
            "insert requires at least one column".to_string(),
        ));
    }
    for column in columns {
        validate_identifier(column)?;
    }
    let template = format!(
        "INSERT INTO {table} ({}) VALUES {VALUES_MARKER}",
        columns.join(", ")
    );
    expand_values(dialect, &template, columns.len(), rows, page_size)
}

/// Expand the [`VALUES_MARKER`] in `template` once per page of `rows`.
pub fn upsert_statements(
    dialect: Dialect,
    template: &str,
    rows: &[Vec<SqlValue>],
    page_size: usize,
) -> Result<Vec<Statement>, LedgerError> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    expand_values(dialect, template, first.len(), rows, page_size)
}

fn expand_values(
    dialect: Dialect,
    template: &str,
    width: usize,
    rows: &[Vec<SqlValue>],
    page_size: usize,
) -> Result<Vec<Statement>, LedgerError> {
    if template.matches(VALUES_MARKER).count() != 1 {
        return Err(LedgerError::InvalidStatement(format!(
            "template must contain exactly one `{VALUES_MARKER}` marker"
        )));
    }
    if width == 0 {
        return Err(LedgerError::InvalidStatement(
            "rows must contain at least one value".to_string(),
        ));
    }
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(LedgerError::InvalidStatement(format!(
            "row {idx} has {} values, expected {width}",
            row.len()
        )));
    }
    // Only row values are bound.
    if dialect.has_own_placeholders(template) {
        return Err(LedgerError::InvalidStatement(
            "template may not carry its own parameters".to_string(),
        ));
    }

    let page = page_size.max(1).min(MAX_BIND_PARAMS / width).max(1);
    Ok(rows
        .chunks(page)
        .map(|chunk| {
            let values = dialect.values_list(chunk.len(), width);
            Statement {
                sql: template.replacen(VALUES_MARKER, &values, 1),
                params: chunk.iter().flatten().cloned().collect(),
            }
        })
        .collect())
}
