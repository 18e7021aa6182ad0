//! Column and table references.
//!
//! References parse from plain strings (`"users.id"`, `"id AS user_id"`,
//! `"users u"`) and render with dialect-aware quoting. A `raw` reference is
//! injected verbatim and never quoted or aliased by the renderer.

use crate::dialect::Dialect;

/// A column reference: optional table qualifier, name, optional alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub raw: bool,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
            alias: None,
            raw: false,
        }
    }

    /// A pre-formed SQL expression injected verbatim (no quoting, no alias).
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            table: None,
            name: sql.into(),
            alias: None,
            raw: true,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parse `"name"`, `"table.name"`, `"table.name AS alias"`.
    pub fn parse(input: &str) -> Self {
        let (path, alias) = split_alias(input.trim());
        let mut col = match path.rsplit_once('.') {
            Some((table, name)) => ColumnRef::new(name.trim()).with_table(table.trim()),
            None => ColumnRef::new(path),
        };
        if let Some(alias) = alias {
            col = col.with_alias(alias);
        }
        col
    }

    pub(crate) fn write_sql(&self, out: &mut String, dialect: Dialect) {
        if self.raw {
            // Verbatim; alias is intentionally not rendered for raw refs.
            out.push_str(&self.name);
            return;
        }
        if let Some(table) = &self.table {
            write_quoted_path(out, table, dialect);
            out.push('.');
        }
        write_quoted_path(out, &self.name, dialect);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            write_quoted_path(out, alias, dialect);
        }
    }
}

/// A table reference by name, with optional alias.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub raw: bool,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            raw: false,
        }
    }

    /// A pre-formed FROM expression injected verbatim.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            name: sql.into(),
            alias: None,
            raw: true,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parse `"users"`, `"users u"` or `"users AS u"`.
    pub fn parse(input: &str) -> Self {
        let (name, alias) = split_alias(input.trim());
        let mut table = TableRef::new(name);
        if let Some(alias) = alias {
            table = table.with_alias(alias);
        }
        table
    }

    pub(crate) fn write_sql(&self, out: &mut String, dialect: Dialect) {
        if self.raw {
            out.push_str(&self.name);
            return;
        }
        write_quoted_path(out, &self.name, dialect);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            write_quoted_path(out, alias, dialect);
        }
    }
}

/// Split a trailing alias: `"x AS a"` / `"x a"` -> (`"x"`, Some(`"a"`)).
fn split_alias(input: &str) -> (&str, Option<&str>) {
    let lower = input.to_ascii_lowercase();
    if let Some(pos) = lower.rfind(" as ") {
        let alias = input[pos + 4..].trim();
        if !alias.is_empty() {
            return (input[..pos].trim_end(), Some(alias));
        }
    }
    let mut parts = input.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(alias), None) => (name, Some(alias)),
        _ => (input, None),
    }
}

/// Quote a dotted identifier path. `*` segments pass through unquoted and the
/// quote character is escaped by doubling.
pub(crate) fn write_quoted_path(out: &mut String, path: &str, dialect: Dialect) {
    let quote = dialect.quote_char();
    for (i, part) in path.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        let part = part.trim();
        if part == "*" {
            out.push('*');
            continue;
        }
        out.push(quote);
        for ch in part.chars() {
            if ch == quote {
                out.push(quote);
            }
            out.push(ch);
        }
        out.push(quote);
    }
}
