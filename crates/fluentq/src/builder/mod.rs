//! The fluent query builder.
//!
//! A [`Builder`] is bound to an executor handle at construction and
//! accumulates clause state through chained calls; [`Builder::compile`]
//! turns that state into one parameterized statement, and the terminal
//! verbs (`find`, `first`, `create`, ...) compile and dispatch it.
//!
//! Entry points that start a new statement (`table`, `from_subquery`,
//! `begin`) take `&self` and return a fresh builder sharing the same
//! executor — per-statement state is never aliased between builders.
//!
//! Programmer errors raised inside infallible fluent calls (an unknown
//! comparison operator, an empty subquery alias) are captured on the
//! builder and returned from `compile()` or the terminal verb; the first
//! captured error wins.

mod compile;
mod verbs;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::BuilderConfig;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::expr::{normalize_op, Combinator, ConditionTree, Expr};
use crate::ident::{ColumnRef, TableRef};
use crate::operand::{
    InListSource, IntoColumn, IntoInList, IntoSubquery, IntoTable, IntoWhereValue, Operand,
    Subquery, WhereValue,
};
use crate::statement::RawFragment;
use crate::value::Value;

/// One SELECT-list entry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SelectItem {
    Column(ColumnRef),
    Raw(RawFragment),
    Subquery { query: RawFragment, alias: String },
}

/// The FROM target: a named table or an aliased subquery.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TableExpr {
    Named(TableRef),
    Subquery { query: RawFragment, alias: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

/// A join clause; every join owns its ON condition tree.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) table: TableExpr,
    pub(crate) on: ConditionTree,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OrderItem {
    Column { column: ColumnRef, descending: bool },
    Raw(RawFragment),
}

/// A deferred programmer error, captured at the mutating call and surfaced
/// by `compile()`/the terminal verb.
#[derive(Clone, Debug)]
pub(crate) enum BuildError {
    InvalidArgument {
        role: &'static str,
        message: String,
    },
    EmptySubqueryAlias,
    Consumed,
    Subquery(String),
}

impl BuildError {
    pub(crate) fn to_error(&self) -> Error {
        match self {
            BuildError::InvalidArgument { role, message } => {
                Error::invalid_argument(*role, message.clone())
            }
            BuildError::EmptySubqueryAlias => Error::EmptySubqueryAlias,
            BuildError::Consumed => Error::BuilderConsumed,
            BuildError::Subquery(message) => Error::invalid_argument("subquery", message.clone()),
        }
    }
}

/// The fluent, query-compiling builder.
#[derive(Clone)]
pub struct Builder {
    pub(crate) exec: Arc<dyn Executor>,
    pub(crate) config: BuilderConfig,
    pub(crate) distinct: bool,
    pub(crate) hint: Option<String>,
    pub(crate) selects: Vec<SelectItem>,
    pub(crate) table: Option<TableExpr>,
    pub(crate) joins: Vec<Join>,
    pub(crate) where_tree: ConditionTree,
    pub(crate) group_by: Vec<ColumnRef>,
    pub(crate) having_tree: ConditionTree,
    pub(crate) order_by: Vec<OrderItem>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) allow_unguarded: bool,
    pub(crate) tx_depth: u32,
    pub(crate) finished: bool,
    pub(crate) build_error: Option<BuildError>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("table", &self.table)
            .field("selects", &self.selects)
            .field("joins", &self.joins.len())
            .field("where_tree", &self.where_tree)
            .field("tx_depth", &self.tx_depth)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Create a builder bound to an executor, with the executor's dialect.
    pub fn new(exec: Arc<dyn Executor>) -> Self {
        let config = BuilderConfig::new(exec.dialect());
        Self::with_config(exec, config)
    }

    /// Create a builder with explicit configuration.
    pub fn with_config(exec: Arc<dyn Executor>, config: BuilderConfig) -> Self {
        Self {
            exec,
            config,
            distinct: false,
            hint: None,
            selects: Vec::new(),
            table: None,
            joins: Vec::new(),
            where_tree: ConditionTree::new(),
            group_by: Vec::new(),
            having_tree: ConditionTree::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            allow_unguarded: false,
            tx_depth: 0,
            finished: false,
            build_error: None,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// A fresh builder on the same executor, config and transaction level,
    /// with empty clause state.
    pub(crate) fn fresh(&self) -> Builder {
        let mut b = Builder::with_config(Arc::clone(&self.exec), self.config.clone());
        b.tx_depth = self.tx_depth;
        b
    }

    // ==================== statement entry points ====================

    /// Start a statement against a named table (`"users"`, `"users u"`).
    pub fn table(&self, table: impl IntoTable) -> Builder {
        let mut b = self.clone();
        b.table = Some(TableExpr::Named(table.into_table()));
        b
    }

    /// Start a statement against a pre-formed FROM expression.
    pub fn table_raw(&self, sql: &str) -> Builder {
        let mut b = self.clone();
        b.table = Some(TableExpr::Named(TableRef::raw(sql)));
        b
    }

    /// Start a statement against a subquery. The alias is mandatory.
    pub fn from_subquery(&self, source: impl IntoSubquery, alias: &str) -> Builder {
        let mut b = self.clone();
        if alias.trim().is_empty() {
            b.record(BuildError::EmptySubqueryAlias);
            return b;
        }
        match b.resolve_subquery(source.into_subquery()) {
            Ok(query) => {
                b.table = Some(TableExpr::Subquery {
                    query,
                    alias: alias.to_string(),
                });
            }
            Err(e) => b.record_error(e),
        }
        b
    }

    // ==================== SELECT list ====================

    /// Replace the SELECT list.
    pub fn select(mut self, cols: &[&str]) -> Self {
        self.guard_mutation();
        self.selects = cols
            .iter()
            .map(|c| SelectItem::Column(ColumnRef::parse(c)))
            .collect();
        self
    }

    /// Append one SELECT column.
    pub fn add_select(mut self, col: impl IntoColumn) -> Self {
        self.guard_mutation();
        self.selects.push(SelectItem::Column(col.into_column()));
        self
    }

    /// Append a raw SELECT expression (no arguments).
    pub fn select_raw(mut self, expr: &str) -> Self {
        self.guard_mutation();
        self.selects.push(SelectItem::Raw(RawFragment::new(expr)));
        self
    }

    /// Append a raw SELECT fragment carrying its own arguments.
    pub fn select_expr(mut self, frag: RawFragment) -> Self {
        self.guard_mutation();
        self.selects.push(SelectItem::Raw(frag));
        self
    }

    /// Append a scalar subquery to the SELECT list, aliased.
    pub fn select_subquery(mut self, source: impl IntoSubquery, alias: &str) -> Self {
        self.guard_mutation();
        match self.resolve_subquery(source.into_subquery()) {
            Ok(query) => self.selects.push(SelectItem::Subquery {
                query,
                alias: alias.to_string(),
            }),
            Err(e) => self.record_error(e),
        }
        self
    }

    pub fn distinct(mut self) -> Self {
        self.guard_mutation();
        self.distinct = true;
        self
    }

    /// Attach an optimizer hint, emitted as `/*+ ... */` after SELECT.
    pub fn hint(mut self, hint: &str) -> Self {
        self.guard_mutation();
        self.hint = Some(hint.to_string());
        self
    }

    // ==================== JOIN ====================

    pub fn join(
        self,
        table: impl IntoTable,
        left: impl IntoColumn,
        op: &str,
        right: impl IntoColumn,
    ) -> Self {
        self.push_join(JoinKind::Inner, TableExpr::Named(table.into_table()), left, op, right)
    }

    pub fn left_join(
        self,
        table: impl IntoTable,
        left: impl IntoColumn,
        op: &str,
        right: impl IntoColumn,
    ) -> Self {
        self.push_join(JoinKind::Left, TableExpr::Named(table.into_table()), left, op, right)
    }

    pub fn right_join(
        self,
        table: impl IntoTable,
        left: impl IntoColumn,
        op: &str,
        right: impl IntoColumn,
    ) -> Self {
        self.push_join(JoinKind::Right, TableExpr::Named(table.into_table()), left, op, right)
    }

    pub fn full_join(
        self,
        table: impl IntoTable,
        left: impl IntoColumn,
        op: &str,
        right: impl IntoColumn,
    ) -> Self {
        self.push_join(JoinKind::Full, TableExpr::Named(table.into_table()), left, op, right)
    }

    /// Join a derived table. The alias is mandatory.
    pub fn join_subquery(
        mut self,
        source: impl IntoSubquery,
        alias: &str,
        left: impl IntoColumn,
        op: &str,
        right: impl IntoColumn,
    ) -> Self {
        if alias.trim().is_empty() {
            self.record(BuildError::EmptySubqueryAlias);
            return self;
        }
        let query = match self.resolve_subquery(source.into_subquery()) {
            Ok(query) => query,
            Err(e) => {
                self.record_error(e);
                return self;
            }
        };
        let table = TableExpr::Subquery {
            query,
            alias: alias.to_string(),
        };
        self.push_join(JoinKind::Inner, table, left, op, right)
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        table: TableExpr,
        left: impl IntoColumn,
        op: &str,
        right: impl IntoColumn,
    ) -> Self {
        self.guard_mutation();
        let Some(op) = normalize_op(op) else {
            self.record(BuildError::InvalidArgument {
                role: "join-condition",
                message: format!("unsupported comparison operator '{op}'"),
            });
            return self;
        };
        let mut on = ConditionTree::new();
        on.push(
            Combinator::And,
            Expr::Compare {
                column: left.into_column(),
                op,
                value: Operand::Column(right.into_column()),
            },
        );
        self.joins.push(Join { kind, table, on });
        self
    }

    // ==================== WHERE ====================

    /// `column = value`; NULL becomes `IS NULL`, a list becomes `IN (...)`,
    /// a builder or [`subquery`](crate::subquery) becomes `= (SELECT ...)`.
    pub fn where_eq(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_eq(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::Or, expr, false, false)
    }

    /// `column <op> value` with an operator from the closed comparison set.
    pub fn where_cmp(self, col: impl IntoColumn, op: &str, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), op, value.into_where_value());
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_cmp(self, col: impl IntoColumn, op: &str, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), op, value.into_where_value());
        self.push_cond(Combinator::Or, expr, false, false)
    }

    /// Negated equality: `IS NOT NULL` for NULL, `NOT IN` for lists,
    /// `NOT (...)` otherwise.
    pub fn where_not(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::And, expr, true, false)
    }

    pub fn or_where_not(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::Or, expr, true, false)
    }

    pub fn where_in(self, col: impl IntoColumn, values: impl IntoInList) -> Self {
        let expr = self.in_expr(col.into_column(), values.into_in_list(), false);
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_in(self, col: impl IntoColumn, values: impl IntoInList) -> Self {
        let expr = self.in_expr(col.into_column(), values.into_in_list(), false);
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_not_in(self, col: impl IntoColumn, values: impl IntoInList) -> Self {
        let expr = self.in_expr(col.into_column(), values.into_in_list(), true);
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_not_in(self, col: impl IntoColumn, values: impl IntoInList) -> Self {
        let expr = self.in_expr(col.into_column(), values.into_in_list(), true);
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_null(self, col: impl IntoColumn) -> Self {
        let expr = Ok(Expr::NullCheck {
            column: col.into_column(),
            negated: false,
        });
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_null(self, col: impl IntoColumn) -> Self {
        let expr = Ok(Expr::NullCheck {
            column: col.into_column(),
            negated: false,
        });
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_not_null(self, col: impl IntoColumn) -> Self {
        let expr = Ok(Expr::NullCheck {
            column: col.into_column(),
            negated: true,
        });
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_not_null(self, col: impl IntoColumn) -> Self {
        let expr = Ok(Expr::NullCheck {
            column: col.into_column(),
            negated: true,
        });
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_between(
        self,
        col: impl IntoColumn,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let expr = Ok(Expr::Between {
            column: col.into_column(),
            low: low.into(),
            high: high.into(),
            negated: false,
        });
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_between(
        self,
        col: impl IntoColumn,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let expr = Ok(Expr::Between {
            column: col.into_column(),
            low: low.into(),
            high: high.into(),
            negated: false,
        });
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_not_between(
        self,
        col: impl IntoColumn,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let expr = Ok(Expr::Between {
            column: col.into_column(),
            low: low.into(),
            high: high.into(),
            negated: true,
        });
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn where_like(self, col: impl IntoColumn, pattern: impl Into<Value>) -> Self {
        let expr = Ok(Expr::Like {
            column: col.into_column(),
            pattern: pattern.into(),
            negated: false,
        });
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_like(self, col: impl IntoColumn, pattern: impl Into<Value>) -> Self {
        let expr = Ok(Expr::Like {
            column: col.into_column(),
            pattern: pattern.into(),
            negated: false,
        });
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_not_like(self, col: impl IntoColumn, pattern: impl Into<Value>) -> Self {
        let expr = Ok(Expr::Like {
            column: col.into_column(),
            pattern: pattern.into(),
            negated: true,
        });
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn where_exists(self, source: impl IntoSubquery) -> Self {
        let expr = self.exists_expr(source.into_subquery(), false);
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_exists(self, source: impl IntoSubquery) -> Self {
        let expr = self.exists_expr(source.into_subquery(), false);
        self.push_cond(Combinator::Or, expr, false, false)
    }

    pub fn where_not_exists(self, source: impl IntoSubquery) -> Self {
        let expr = self.exists_expr(source.into_subquery(), true);
        self.push_cond(Combinator::And, expr, false, false)
    }

    /// Splice a raw condition; `?` placeholders bind `args` in order.
    pub fn where_raw(self, sql: &str, args: Vec<Value>) -> Self {
        let expr = Ok(Expr::Raw(RawFragment::with_args(sql, args)));
        self.push_cond(Combinator::And, expr, false, false)
    }

    pub fn or_where_raw(self, sql: &str, args: Vec<Value>) -> Self {
        let expr = Ok(Expr::Raw(RawFragment::with_args(sql, args)));
        self.push_cond(Combinator::Or, expr, false, false)
    }

    /// `AND NOT (raw)`.
    pub fn where_raw_not(self, sql: &str, args: Vec<Value>) -> Self {
        let expr = Ok(Expr::Raw(RawFragment::with_args(sql, args)));
        self.push_cond(Combinator::And, expr, true, false)
    }

    /// `OR NOT (raw)` — the OR combinator is always rendered.
    pub fn or_where_raw_not(self, sql: &str, args: Vec<Value>) -> Self {
        let expr = Ok(Expr::Raw(RawFragment::with_args(sql, args)));
        self.push_cond(Combinator::Or, expr, true, false)
    }

    /// Group conditions built on a fresh builder: `AND ( ... )`.
    pub fn where_group<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        self.push_group(Combinator::And, f, false)
    }

    /// `OR ( ... )`.
    pub fn or_where_group<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        self.push_group(Combinator::Or, f, false)
    }

    /// `AND NOT ( ... )`.
    pub fn where_group_not<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        self.push_group(Combinator::And, f, true)
    }

    /// `OR NOT ( ... )`.
    pub fn or_where_group_not<F>(self, f: F) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        self.push_group(Combinator::Or, f, true)
    }

    // ==================== GROUP BY / HAVING ====================

    /// Append a GROUP BY column.
    pub fn group_by(mut self, col: impl IntoColumn) -> Self {
        self.guard_mutation();
        self.group_by.push(col.into_column());
        self
    }

    pub fn having_eq(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::And, expr, false, true)
    }

    pub fn having_cmp(self, col: impl IntoColumn, op: &str, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), op, value.into_where_value());
        self.push_cond(Combinator::And, expr, false, true)
    }

    pub fn or_having_eq(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::Or, expr, false, true)
    }

    pub fn or_having_cmp(self, col: impl IntoColumn, op: &str, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), op, value.into_where_value());
        self.push_cond(Combinator::Or, expr, false, true)
    }

    /// `OR NOT (column = value)` in the HAVING tree — the OR combinator is
    /// always rendered.
    pub fn or_having_not(self, col: impl IntoColumn, value: impl IntoWhereValue) -> Self {
        let expr = self.cmp_expr(col.into_column(), "=", value.into_where_value());
        self.push_cond(Combinator::Or, expr, true, true)
    }

    pub fn having_raw(self, sql: &str, args: Vec<Value>) -> Self {
        let expr = Ok(Expr::Raw(RawFragment::with_args(sql, args)));
        self.push_cond(Combinator::And, expr, false, true)
    }

    // ==================== ORDER / LIMIT ====================

    pub fn order_by(mut self, col: impl IntoColumn) -> Self {
        self.guard_mutation();
        self.order_by.push(OrderItem::Column {
            column: col.into_column(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, col: impl IntoColumn) -> Self {
        self.guard_mutation();
        self.order_by.push(OrderItem::Column {
            column: col.into_column(),
            descending: true,
        });
        self
    }

    pub fn order_by_raw(mut self, sql: &str) -> Self {
        self.guard_mutation();
        self.order_by.push(OrderItem::Raw(RawFragment::new(sql)));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.guard_mutation();
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.guard_mutation();
        self.offset = Some(n);
        self
    }

    /// Pagination helper; `page` is 1-based and clamped to >= 1.
    pub fn paginate(mut self, page: u64, per_page: u64) -> Self {
        self.guard_mutation();
        let page = page.max(1);
        let per_page = per_page.max(1);
        self.limit = Some(per_page);
        self.offset = Some((page - 1) * per_page);
        self
    }

    /// Permit UPDATE/DELETE without WHERE conditions.
    pub fn allow_unguarded(mut self) -> Self {
        self.allow_unguarded = true;
        self
    }

    // ==================== resolution internals ====================

    /// Record a deferred programmer error; the first one wins.
    pub(crate) fn record(&mut self, err: BuildError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    pub(crate) fn record_error(&mut self, err: Error) {
        let build_error = match err {
            Error::InvalidArgument { role, message } => BuildError::InvalidArgument { role, message },
            Error::EmptySubqueryAlias => BuildError::EmptySubqueryAlias,
            Error::BuilderConsumed => BuildError::Consumed,
            other => BuildError::Subquery(other.to_string()),
        };
        self.record(build_error);
    }

    fn guard_mutation(&mut self) {
        if self.finished {
            self.record(BuildError::Consumed);
        }
    }

    fn push_cond(
        mut self,
        combinator: Combinator,
        expr: Result<Expr>,
        negate: bool,
        having: bool,
    ) -> Self {
        self.guard_mutation();
        match expr {
            Ok(expr) => {
                let expr = if negate { expr.negate() } else { expr };
                if having {
                    self.having_tree.push(combinator, expr);
                } else {
                    self.where_tree.push(combinator, expr);
                }
            }
            Err(e) => self.record_error(e),
        }
        self
    }

    fn push_group<F>(mut self, combinator: Combinator, f: F, negate: bool) -> Self
    where
        F: FnOnce(Builder) -> Builder,
    {
        self.guard_mutation();
        let sub = f(self.fresh());
        if let Some(err) = sub.build_error.clone() {
            self.record(err);
            return self;
        }
        if sub.where_tree.is_empty() {
            return self;
        }
        let expr = Expr::Group(sub.where_tree);
        let expr = if negate { expr.negate() } else { expr };
        self.where_tree.push(combinator, expr);
        self
    }

    /// Build a comparison expression, resolving the value per its shape.
    fn cmp_expr(&self, column: ColumnRef, op: &str, value: WhereValue) -> Result<Expr> {
        let Some(op) = normalize_op(op) else {
            return Err(Error::invalid_argument(
                "where-value",
                format!("unsupported comparison operator '{op}'"),
            ));
        };
        match value {
            WhereValue::Value(Value::Null) => match op {
                "=" => Ok(Expr::NullCheck {
                    column,
                    negated: false,
                }),
                "!=" | "<>" => Ok(Expr::NullCheck {
                    column,
                    negated: true,
                }),
                _ => Err(Error::invalid_argument(
                    "where-value",
                    format!("NULL is only comparable with '=' or '<>', got '{op}'"),
                )),
            },
            WhereValue::List(values) => match op {
                "=" => Ok(Expr::InList {
                    column,
                    values,
                    negated: false,
                }),
                "!=" | "<>" => Ok(Expr::InList {
                    column,
                    values,
                    negated: true,
                }),
                _ => Err(Error::invalid_argument(
                    "where-value",
                    format!("a list is only comparable with '=' or '<>', got '{op}'"),
                )),
            },
            WhereValue::Value(value) => Ok(Expr::Compare {
                column,
                op,
                value: Operand::Value(value),
            }),
            WhereValue::Raw(frag) => Ok(Expr::Compare {
                column,
                op,
                value: Operand::Raw(frag),
            }),
            WhereValue::Query(sub) => Ok(Expr::Compare {
                column,
                op,
                value: Operand::Subquery(self.resolve_subquery(sub)?),
            }),
        }
    }

    fn in_expr(&self, column: ColumnRef, source: InListSource, negated: bool) -> Result<Expr> {
        match source {
            InListSource::Values(values) => Ok(Expr::InList {
                column,
                values,
                negated,
            }),
            InListSource::Query(sub) => Ok(Expr::InSubquery {
                column,
                query: self.resolve_subquery(sub)?,
                negated,
            }),
        }
    }

    fn exists_expr(&self, sub: Subquery, negated: bool) -> Result<Expr> {
        Ok(Expr::Exists {
            query: self.resolve_subquery(sub)?,
            negated,
        })
    }

    /// Compile a subquery now, against a fresh builder bound to the same
    /// executor, and wrap it in parentheses with its arguments in order.
    pub(crate) fn resolve_subquery(&self, sub: Subquery) -> Result<RawFragment> {
        let builder = sub.resolve(self.fresh());
        let stmt = builder.compile_canonical()?;
        Ok(RawFragment::with_args(format!("({})", stmt.sql), stmt.args))
    }
}
