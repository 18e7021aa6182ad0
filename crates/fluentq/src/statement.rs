//! Compiled statements, raw fragments, and the SQL writer.
//!
//! Every clause renders through one [`SqlWriter`], which appends a
//! fragment's arguments at the moment its placeholders are emitted. That
//! single rule is what keeps placeholder order and argument order aligned,
//! including across embedded subqueries. The writer emits canonical `?`
//! placeholders; a final pass renumbers them to `$n` for Postgres.

use serde::Serialize;

use crate::dialect::Dialect;
use crate::value::Value;

/// A pre-formed SQL fragment with `?` placeholders and its arguments.
///
/// `args.len()` need not equal the placeholder count; a driver may expand
/// one placeholder into several values, and surplus arguments are appended
/// after the fragment's own placeholders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawFragment {
    pub sql: String,
    pub args: Vec<Value>,
}

impl RawFragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// The output of compilation: SQL text plus its ordered argument list.
///
/// Immutable once produced; compiling the same builder state twice yields
/// an identical statement. Serializable so statements can be exported for
/// audit logs and statement caches.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompiledStatement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl CompiledStatement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Number of `?` placeholders in the canonical SQL text.
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Accumulates SQL text and arguments in emission order.
pub(crate) struct SqlWriter {
    sql: String,
    args: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self {
            sql: String::with_capacity(128),
            args: Vec::new(),
        }
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub(crate) fn push_char(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Emit one placeholder and queue its argument.
    pub(crate) fn push_value(&mut self, value: Value) {
        self.sql.push('?');
        self.args.push(value);
    }

    /// Splice a raw fragment: its text verbatim, its arguments in order.
    pub(crate) fn push_fragment(&mut self, frag: &RawFragment) {
        self.sql.push_str(&frag.sql);
        self.args.extend(frag.args.iter().cloned());
    }

    pub(crate) fn sql_mut(&mut self) -> &mut String {
        &mut self.sql
    }

    pub(crate) fn finish(self, dialect: Dialect) -> CompiledStatement {
        let sql = if dialect.numbered_placeholders() {
            number_placeholders(&self.sql)
        } else {
            self.sql
        };
        CompiledStatement { sql, args: self.args }
    }

    /// Finish without dialect renumbering, for embedding as a subquery.
    pub(crate) fn finish_canonical(self) -> CompiledStatement {
        CompiledStatement {
            sql: self.sql,
            args: self.args,
        }
    }
}

/// Rewrite canonical `?` placeholders as `$1..$n`, left to right.
pub(crate) fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0usize;
    for ch in sql.chars() {
        if ch == '?' {
            index += 1;
            out.push('$');
            out.push_str(&index.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}
