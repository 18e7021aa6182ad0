//! Terminal verbs: compile the accumulated state, dispatch it, and mark the
//! builder finished. A second terminal verb on the same builder fails with
//! [`Error::BuilderConsumed`]; verbs that need two statements
//! (`first_or_create`) run them on private clones.

use tracing::debug;

use crate::builder::{Builder, OrderItem, SelectItem};
use crate::error::{Error, Result};
use crate::expr::{Combinator, Expr};
use crate::ident::ColumnRef;
use crate::operand::{IntoAssignments, Operand, SetValue};
use crate::row::{FromRow, Row};
use crate::statement::{CompiledStatement, RawFragment};
use crate::value::Value;

impl Builder {
    fn start_terminal(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::BuilderConsumed);
        }
        self.finished = true;
        Ok(())
    }

    async fn dispatch_query(&self, stmt: &CompiledStatement) -> Result<Vec<Row>> {
        debug!(sql = %stmt.sql, args = stmt.args.len(), "query");
        self.exec.query(&stmt.sql, &stmt.args).await
    }

    async fn dispatch_execute(&self, stmt: &CompiledStatement) -> Result<u64> {
        debug!(sql = %stmt.sql, args = stmt.args.len(), "execute");
        self.exec.execute(&stmt.sql, &stmt.args).await
    }

    /// A clone prepared for single-row retrieval: implicit primary-key
    /// order (only when no explicit order is set) plus `LIMIT 1`.
    fn one_row_query(&self, descending: bool) -> Builder {
        let mut q = self.clone();
        if q.order_by.is_empty() {
            q.order_by.push(OrderItem::Column {
                column: ColumnRef::parse(q.config.primary_key()),
                descending,
            });
        }
        q.limit = Some(1);
        q
    }

    // ==================== retrieval ====================

    /// Run the SELECT and return every row.
    pub async fn find(&mut self) -> Result<Vec<Row>> {
        self.start_terminal()?;
        let stmt = self.compile()?;
        self.dispatch_query(&stmt).await
    }

    /// Run the SELECT and map every row to `T`.
    pub async fn find_as<T: FromRow>(&mut self) -> Result<Vec<T>> {
        let rows = self.find().await?;
        rows.iter().map(T::from_row).collect()
    }

    /// First row by primary key order (unless an explicit order is set).
    pub async fn first(&mut self) -> Result<Option<Row>> {
        self.start_terminal()?;
        let stmt = self.one_row_query(false).compile()?;
        Ok(self.dispatch_query(&stmt).await?.into_iter().next())
    }

    pub async fn first_as<T: FromRow>(&mut self) -> Result<Option<T>> {
        let row = self.first().await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Last row by primary key order (unless an explicit order is set).
    pub async fn last(&mut self) -> Result<Option<Row>> {
        self.start_terminal()?;
        let stmt = self.one_row_query(true).compile()?;
        Ok(self.dispatch_query(&stmt).await?.into_iter().next())
    }

    pub async fn last_as<T: FromRow>(&mut self) -> Result<Option<T>> {
        let row = self.last().await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// One column of the first row.
    pub async fn value(&mut self, col: &str) -> Result<Option<Value>> {
        self.start_terminal()?;
        let mut q = self.one_row_query(false);
        q.selects = vec![SelectItem::Column(ColumnRef::parse(col))];
        let stmt = q.compile()?;
        Ok(self
            .dispatch_query(&stmt)
            .await?
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next()))
    }

    /// One column of every row.
    pub async fn pluck(&mut self, col: &str) -> Result<Vec<Value>> {
        self.start_terminal()?;
        let mut q = self.clone();
        q.selects = vec![SelectItem::Column(ColumnRef::parse(col))];
        let stmt = q.compile()?;
        Ok(self
            .dispatch_query(&stmt)
            .await?
            .into_iter()
            .map(|row| row.into_values().into_iter().next().unwrap_or(Value::Null))
            .collect())
    }

    /// `SELECT COUNT(*)` over the accumulated state.
    pub async fn count(&mut self) -> Result<i64> {
        self.start_terminal()?;
        let stmt = self.compile_count()?;
        let rows = self.dispatch_query(&stmt).await?;
        let row = rows
            .first()
            .ok_or_else(|| Error::execution("COUNT returned no rows"))?;
        row.try_get_index::<i64>(0)
    }

    pub async fn sum(&mut self, col: &str) -> Result<Value> {
        self.aggregate("SUM", col).await
    }

    pub async fn avg(&mut self, col: &str) -> Result<Value> {
        self.aggregate("AVG", col).await
    }

    pub async fn min(&mut self, col: &str) -> Result<Value> {
        self.aggregate("MIN", col).await
    }

    pub async fn max(&mut self, col: &str) -> Result<Value> {
        self.aggregate("MAX", col).await
    }

    async fn aggregate(&mut self, func: &'static str, col: &str) -> Result<Value> {
        self.start_terminal()?;
        let stmt = self.compile_aggregate(func, col)?;
        Ok(self
            .dispatch_query(&stmt)
            .await?
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next())
            .unwrap_or(Value::Null))
    }

    /// Whether any row matches the accumulated state.
    pub async fn exists_row(&mut self) -> Result<bool> {
        self.start_terminal()?;
        let mut q = self.clone();
        q.selects = vec![SelectItem::Raw(RawFragment::new("1"))];
        q.order_by.clear();
        q.limit = Some(1);
        q.offset = None;
        let stmt = q.compile()?;
        Ok(!self.dispatch_query(&stmt).await?.is_empty())
    }

    // ==================== mutation ====================

    /// INSERT one row; returns the affected row count.
    pub async fn create(&mut self, data: impl IntoAssignments) -> Result<u64> {
        self.start_terminal()?;
        let rows = [data.into_assignments()];
        let stmt = self.compile_insert(&rows)?;
        self.dispatch_execute(&stmt).await
    }

    /// INSERT several rows in one statement; all rows must share the same
    /// column list.
    pub async fn create_many<A: IntoAssignments>(&mut self, rows: Vec<A>) -> Result<u64> {
        self.start_terminal()?;
        let rows: Vec<_> = rows
            .into_iter()
            .map(IntoAssignments::into_assignments)
            .collect();
        if rows.is_empty() {
            return Ok(0);
        }
        let stmt = self.compile_insert(&rows)?;
        self.dispatch_execute(&stmt).await
    }

    /// UPDATE matching rows. Refuses to run without WHERE conditions unless
    /// `allow_unguarded()` was chained.
    pub async fn update(&mut self, data: impl IntoAssignments) -> Result<u64> {
        self.start_terminal()?;
        let stmt = self.compile_update(data.into_assignments())?;
        self.dispatch_execute(&stmt).await
    }

    /// DELETE matching rows. Same guard as [`update`](Builder::update).
    pub async fn delete(&mut self) -> Result<u64> {
        self.start_terminal()?;
        let stmt = self.compile_delete()?;
        self.dispatch_execute(&stmt).await
    }

    /// INSERT with a conflict clause: `ON DUPLICATE KEY UPDATE` (MySQL) or
    /// `ON CONFLICT (keys) DO UPDATE` (Postgres). With `update_columns` of
    /// `None`, every non-key column is updated.
    pub async fn upsert(
        &mut self,
        data: impl IntoAssignments,
        conflict_keys: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<u64> {
        self.start_terminal()?;
        let stmt = self.compile_upsert(data.into_assignments(), conflict_keys, update_columns)?;
        self.dispatch_execute(&stmt).await
    }

    /// Fetch the first row matching `attrs` (by equality), inserting it
    /// first when no row matches. Raw-expression attributes participate in
    /// the insert but not in the match.
    pub async fn first_or_create(&mut self, attrs: impl IntoAssignments) -> Result<Row> {
        self.start_terminal()?;
        let attrs = attrs.into_assignments();

        let mut match_query = self.one_row_query(false);
        for (col, value) in &attrs {
            if let SetValue::Value(v) = value {
                let expr = if v.is_null() {
                    Expr::NullCheck {
                        column: ColumnRef::parse(col),
                        negated: false,
                    }
                } else {
                    Expr::Compare {
                        column: ColumnRef::parse(col),
                        op: "=",
                        value: Operand::Value(v.clone()),
                    }
                };
                match_query.where_tree.push(Combinator::And, expr);
            }
        }
        let select = match_query.compile()?;
        if let Some(row) = self.dispatch_query(&select).await?.into_iter().next() {
            return Ok(row);
        }

        let rows = [attrs];
        let insert = self.compile_insert(&rows)?;
        self.dispatch_execute(&insert).await?;

        self.dispatch_query(&select)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("row missing after first_or_create insert"))
    }

    // ==================== raw statements ====================

    /// Run a hand-written statement and return the affected row count.
    pub async fn execute_raw(&self, sql: &str, args: Vec<Value>) -> Result<u64> {
        debug!(sql, args = args.len(), "execute raw");
        self.exec.execute(sql, &args).await
    }

    /// Run a hand-written query and return its rows.
    pub async fn fetch_raw(&self, sql: &str, args: Vec<Value>) -> Result<Vec<Row>> {
        debug!(sql, args = args.len(), "fetch raw");
        self.exec.query(sql, &args).await
    }
}
