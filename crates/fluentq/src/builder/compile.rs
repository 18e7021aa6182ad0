//! Clause assembly: builder state -> compiled statement.
//!
//! Compilation is read-only and idempotent: the same builder state always
//! yields byte-identical SQL and the same argument order. Clauses render in
//! one fixed order, and arguments are collected as their placeholders are
//! emitted, so argument order always matches placeholder order even when a
//! SELECT-position subquery contributes arguments before the WHERE clause.

use crate::builder::{Builder, OrderItem, SelectItem, TableExpr};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::ident::write_quoted_path;
use crate::operand::SetValue;
use crate::statement::{CompiledStatement, RawFragment, SqlWriter};

impl Builder {
    /// Compile the accumulated state into one SELECT statement.
    pub fn compile(&self) -> Result<CompiledStatement> {
        Ok(self.render_select()?.finish(self.config.dialect))
    }

    /// Compile with canonical `?` placeholders, for embedding as a subquery.
    pub(crate) fn compile_canonical(&self) -> Result<CompiledStatement> {
        Ok(self.render_select()?.finish_canonical())
    }

    pub(crate) fn check_build_error(&self) -> Result<()> {
        match &self.build_error {
            Some(err) => Err(err.to_error()),
            None => Ok(()),
        }
    }

    fn render_select(&self) -> Result<SqlWriter> {
        self.check_build_error()?;
        let dialect = self.config.dialect;
        let mut w = SqlWriter::new();

        w.push_str("SELECT ");
        if let Some(hint) = &self.hint {
            w.push_str("/*+ ");
            w.push_str(hint);
            w.push_str(" */ ");
        }
        if self.distinct {
            w.push_str("DISTINCT ");
        }

        if self.selects.is_empty() {
            w.push_char('*');
        } else {
            for (i, item) in self.selects.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                match item {
                    SelectItem::Column(col) => col.write_sql(w.sql_mut(), dialect),
                    SelectItem::Raw(frag) => w.push_fragment(frag),
                    SelectItem::Subquery { query, alias } => {
                        w.push_fragment(query);
                        w.push_str(" AS ");
                        write_quoted_path(w.sql_mut(), alias, dialect);
                    }
                }
            }
        }

        w.push_str(" FROM ");
        self.write_from(&mut w)?;

        for join in &self.joins {
            w.push_char(' ');
            w.push_str(join.kind.keyword());
            w.push_char(' ');
            write_table_expr(&mut w, &join.table, dialect);
            w.push_str(" ON ");
            join.on.write_sql(&mut w, dialect);
        }

        if !self.where_tree.is_empty() {
            w.push_str(" WHERE ");
            self.where_tree.write_sql(&mut w, dialect);
        }

        if !self.group_by.is_empty() {
            w.push_str(" GROUP BY ");
            for (i, col) in self.group_by.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                col.write_sql(w.sql_mut(), dialect);
            }
        }

        if !self.having_tree.is_empty() {
            w.push_str(" HAVING ");
            self.having_tree.write_sql(&mut w, dialect);
        }

        if !self.order_by.is_empty() {
            w.push_str(" ORDER BY ");
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.push_str(", ");
                }
                match item {
                    OrderItem::Column { column, descending } => {
                        column.write_sql(w.sql_mut(), dialect);
                        w.push_str(if *descending { " DESC" } else { " ASC" });
                    }
                    OrderItem::Raw(frag) => w.push_fragment(frag),
                }
            }
        }

        if let Some(limit) = self.limit {
            w.push_str(" LIMIT ");
            w.push_str(&limit.to_string());
        }
        if let Some(offset) = self.offset {
            w.push_str(" OFFSET ");
            w.push_str(&offset.to_string());
        }

        Ok(w)
    }

    /// COUNT compilation: replaces the select list with `COUNT(*)` and drops
    /// ORDER BY/LIMIT/OFFSET; grouped queries are wrapped in a derived table
    /// so the count covers groups, not rows.
    pub(crate) fn compile_count(&self) -> Result<CompiledStatement> {
        self.check_build_error()?;
        if self.group_by.is_empty() && self.having_tree.is_empty() {
            let mut q = self.clone();
            q.selects = vec![SelectItem::Raw(RawFragment::new("COUNT(*)"))];
            q.distinct = false;
            q.order_by.clear();
            q.limit = None;
            q.offset = None;
            q.compile()
        } else {
            let mut inner = self.clone();
            inner.selects = vec![SelectItem::Raw(RawFragment::new("1"))];
            inner.order_by.clear();
            inner.limit = None;
            inner.offset = None;
            let stmt = inner.compile_canonical()?;
            let mut w = SqlWriter::new();
            w.push_str("SELECT COUNT(*) FROM ");
            w.push_fragment(&RawFragment::with_args(format!("({})", stmt.sql), stmt.args));
            w.push_str(" AS ");
            write_quoted_path(w.sql_mut(), "t", self.config.dialect);
            Ok(w.finish(self.config.dialect))
        }
    }

    /// Aggregate compilation (`SUM`, `AVG`, `MIN`, `MAX`) over one column.
    pub(crate) fn compile_aggregate(&self, func: &str, column: &str) -> Result<CompiledStatement> {
        self.check_build_error()?;
        let mut q = self.clone();
        let quoted = self.config.dialect.quote_identifier(column);
        q.selects = vec![SelectItem::Raw(RawFragment::new(format!("{func}({quoted})")))];
        q.distinct = false;
        q.order_by.clear();
        q.limit = None;
        q.offset = None;
        q.compile()
    }

    /// INSERT compilation for one or more rows sharing a column list.
    pub(crate) fn compile_insert(
        &self,
        rows: &[Vec<(String, SetValue)>],
    ) -> Result<CompiledStatement> {
        Ok(self.render_insert(rows)?.finish(self.config.dialect))
    }

    pub(crate) fn render_insert(&self, rows: &[Vec<(String, SetValue)>]) -> Result<SqlWriter> {
        self.check_build_error()?;
        let dialect = self.config.dialect;
        let mut w = SqlWriter::new();
        w.push_str("INSERT INTO ");
        self.write_mutation_table(&mut w)?;

        if rows.is_empty() || rows[0].is_empty() {
            match dialect {
                Dialect::MySql => w.push_str(" () VALUES ()"),
                Dialect::Postgres => w.push_str(" DEFAULT VALUES"),
            }
            return Ok(w);
        }

        let columns: Vec<&str> = rows[0].iter().map(|(c, _)| c.as_str()).collect();
        for row in &rows[1..] {
            let same = row.len() == columns.len()
                && row.iter().zip(&columns).all(|((c, _), expected)| c == expected);
            if !same {
                return Err(Error::invalid_argument(
                    "insert",
                    "all rows must share the same column list",
                ));
            }
        }

        w.push_str(" (");
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            write_quoted_path(w.sql_mut(), col, dialect);
        }
        w.push_str(") VALUES ");
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            w.push_char('(');
            for (j, (_, value)) in row.iter().enumerate() {
                if j > 0 {
                    w.push_str(", ");
                }
                match value {
                    SetValue::Value(v) => w.push_value(v.clone()),
                    SetValue::Raw(frag) => w.push_fragment(frag),
                }
            }
            w.push_char(')');
        }
        Ok(w)
    }

    /// Upsert compilation: INSERT plus the dialect's conflict clause.
    pub(crate) fn compile_upsert(
        &self,
        row: Vec<(String, SetValue)>,
        conflict_keys: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<CompiledStatement> {
        if conflict_keys.is_empty() {
            return Err(Error::invalid_argument(
                "upsert",
                "conflict key list must not be empty",
            ));
        }
        let update_cols: Vec<String> = match update_columns {
            Some(cols) => cols.iter().map(|c| c.to_string()).collect(),
            None => row
                .iter()
                .map(|(c, _)| c.clone())
                .filter(|c| !conflict_keys.contains(&c.as_str()))
                .collect(),
        };
        if update_cols.is_empty() {
            return Err(Error::invalid_argument(
                "upsert",
                "no columns left to update on conflict",
            ));
        }

        let dialect = self.config.dialect;
        let rows = [row];
        let mut w = self.render_insert(&rows)?;
        match dialect {
            Dialect::MySql => {
                w.push_str(" ON DUPLICATE KEY UPDATE ");
                for (i, col) in update_cols.iter().enumerate() {
                    if i > 0 {
                        w.push_str(", ");
                    }
                    write_quoted_path(w.sql_mut(), col, dialect);
                    w.push_str(" = VALUES(");
                    write_quoted_path(w.sql_mut(), col, dialect);
                    w.push_char(')');
                }
            }
            Dialect::Postgres => {
                w.push_str(" ON CONFLICT (");
                for (i, key) in conflict_keys.iter().enumerate() {
                    if i > 0 {
                        w.push_str(", ");
                    }
                    write_quoted_path(w.sql_mut(), key, dialect);
                }
                w.push_str(") DO UPDATE SET ");
                for (i, col) in update_cols.iter().enumerate() {
                    if i > 0 {
                        w.push_str(", ");
                    }
                    write_quoted_path(w.sql_mut(), col, dialect);
                    w.push_str(" = EXCLUDED.");
                    write_quoted_path(w.sql_mut(), col, dialect);
                }
            }
        }
        Ok(w.finish(dialect))
    }

    /// UPDATE compilation; SET arguments precede WHERE arguments because
    /// they are emitted first.
    pub(crate) fn compile_update(
        &self,
        sets: Vec<(String, SetValue)>,
    ) -> Result<CompiledStatement> {
        self.check_build_error()?;
        if sets.is_empty() {
            return Err(Error::invalid_argument("update", "SET list must not be empty"));
        }
        if self.where_tree.is_empty() && !self.allow_unguarded {
            return Err(Error::UnguardedMutation { verb: "UPDATE" });
        }
        let dialect = self.config.dialect;
        let mut w = SqlWriter::new();
        w.push_str("UPDATE ");
        self.write_mutation_table(&mut w)?;
        w.push_str(" SET ");
        for (i, (col, value)) in sets.iter().enumerate() {
            if i > 0 {
                w.push_str(", ");
            }
            write_quoted_path(w.sql_mut(), col, dialect);
            w.push_str(" = ");
            match value {
                SetValue::Value(v) => w.push_value(v.clone()),
                SetValue::Raw(frag) => w.push_fragment(frag),
            }
        }
        if !self.where_tree.is_empty() {
            w.push_str(" WHERE ");
            self.where_tree.write_sql(&mut w, dialect);
        }
        Ok(w.finish(dialect))
    }

    /// DELETE compilation.
    pub(crate) fn compile_delete(&self) -> Result<CompiledStatement> {
        self.check_build_error()?;
        if self.where_tree.is_empty() && !self.allow_unguarded {
            return Err(Error::UnguardedMutation { verb: "DELETE" });
        }
        let dialect = self.config.dialect;
        let mut w = SqlWriter::new();
        w.push_str("DELETE FROM ");
        self.write_mutation_table(&mut w)?;
        if !self.where_tree.is_empty() {
            w.push_str(" WHERE ");
            self.where_tree.write_sql(&mut w, dialect);
        }
        Ok(w.finish(dialect))
    }

    /// FROM target for SELECT: explicit table, else the model descriptor's
    /// implicit table, else an error.
    fn write_from(&self, w: &mut SqlWriter) -> Result<()> {
        let dialect = self.config.dialect;
        match &self.table {
            Some(expr) => {
                write_table_expr(w, expr, dialect);
                Ok(())
            }
            None => match self.config.implicit_table() {
                Some(table) => {
                    write_quoted_path(w.sql_mut(), table, dialect);
                    Ok(())
                }
                None => Err(Error::MissingTable),
            },
        }
    }

    /// Mutation target: like [`write_from`] but subquery tables are rejected.
    fn write_mutation_table(&self, w: &mut SqlWriter) -> Result<()> {
        if matches!(self.table, Some(TableExpr::Subquery { .. })) {
            return Err(Error::invalid_argument(
                "table",
                "cannot run a mutation against a subquery table",
            ));
        }
        self.write_from(w)
    }
}

fn write_table_expr(w: &mut SqlWriter, expr: &TableExpr, dialect: Dialect) {
    match expr {
        TableExpr::Named(table) => table.write_sql(w.sql_mut(), dialect),
        TableExpr::Subquery { query, alias } => {
            w.push_fragment(query);
            w.push_str(" AS ");
            write_quoted_path(w.sql_mut(), alias, dialect);
        }
    }
}
