//! Argument resolution: converting caller inputs into typed operands.
//!
//! The source system dispatched on runtime types; here every builder role
//! has a conversion trait, so the dispatch priority is enforced by the type
//! system. Already-typed descriptors pass through, builders and
//! [`subquery`] callbacks compile into parenthesized fragments, strings
//! become identifiers, and bare literals become [`Value`] placeholders.

use crate::builder::Builder;
use crate::dialect::Dialect;
use crate::ident::{ColumnRef, TableRef};
use crate::statement::{RawFragment, SqlWriter};
use crate::value::Value;

/// A resolved argument in a value position.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A literal, rendered as a placeholder.
    Value(Value),
    /// A column reference, rendered quoted.
    Column(ColumnRef),
    /// A raw fragment, spliced verbatim.
    Raw(RawFragment),
    /// A compiled subquery, already parenthesized.
    Subquery(RawFragment),
}

impl Operand {
    pub(crate) fn write_sql(&self, w: &mut SqlWriter, dialect: Dialect) {
        match self {
            Operand::Value(value) => w.push_value(value.clone()),
            Operand::Column(column) => column.write_sql(w.sql_mut(), dialect),
            Operand::Raw(frag) | Operand::Subquery(frag) => w.push_fragment(frag),
        }
    }
}

pub(crate) enum SubquerySource {
    Query(Box<Builder>),
    Callback(Box<dyn FnOnce(Builder) -> Builder + Send>),
}

/// A subquery argument: either an already-configured builder or a deferred
/// callback that receives a fresh builder bound to the same executor.
pub struct Subquery(pub(crate) SubquerySource);

impl Subquery {
    /// Resolve against a fresh builder sharing the outer connection.
    pub(crate) fn resolve(self, fresh: Builder) -> Builder {
        match self.0 {
            SubquerySource::Query(builder) => *builder,
            SubquerySource::Callback(f) => f(fresh),
        }
    }
}

impl std::fmt::Debug for Subquery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            SubquerySource::Query(_) => f.write_str("Subquery(query)"),
            SubquerySource::Callback(_) => f.write_str("Subquery(callback)"),
        }
    }
}

/// Wrap a callback as a deferred subquery argument.
///
/// The callback is invoked with a fresh builder bound to the same executor
/// as the outer builder, at the moment the argument is resolved.
///
/// ```ignore
/// q.where_eq("id", subquery(|q| q.table("b").select(&["id"]).where_eq("x", 1)))
/// ```
pub fn subquery<F>(f: F) -> Subquery
where
    F: FnOnce(Builder) -> Builder + Send + 'static,
{
    Subquery(SubquerySource::Callback(Box::new(f)))
}

/// An input accepted in a value position under a comparison role.
#[derive(Debug)]
pub enum WhereValue {
    Value(Value),
    List(Vec<Value>),
    Raw(RawFragment),
    Query(Subquery),
}

/// Conversion into [`WhereValue`]; the value-position half of the resolver.
pub trait IntoWhereValue {
    fn into_where_value(self) -> WhereValue;
}

macro_rules! impl_where_value_scalar {
    ($($t:ty),* $(,)?) => {$(
        impl IntoWhereValue for $t {
            fn into_where_value(self) -> WhereValue {
                WhereValue::Value(self.into())
            }
        }
    )*};
}

impl_where_value_scalar!(
    i8,
    i16,
    i32,
    i64,
    u16,
    u32,
    f32,
    f64,
    bool,
    &str,
    String,
    Vec<u8>,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
);

impl IntoWhereValue for Value {
    fn into_where_value(self) -> WhereValue {
        match self {
            Value::List(values) => WhereValue::List(values),
            other => WhereValue::Value(other),
        }
    }
}

impl<T: IntoWhereValue> IntoWhereValue for Option<T> {
    fn into_where_value(self) -> WhereValue {
        match self {
            Some(inner) => inner.into_where_value(),
            None => WhereValue::Value(Value::Null),
        }
    }
}

macro_rules! impl_where_value_list {
    ($($t:ty),* $(,)?) => {$(
        impl IntoWhereValue for Vec<$t> {
            fn into_where_value(self) -> WhereValue {
                WhereValue::List(self.into_iter().map(Value::from).collect())
            }
        }
    )*};
}

impl_where_value_list!(i16, i32, i64, u32, f64, bool, &str, String, uuid::Uuid);

impl IntoWhereValue for Vec<Value> {
    fn into_where_value(self) -> WhereValue {
        WhereValue::List(self)
    }
}

impl IntoWhereValue for RawFragment {
    fn into_where_value(self) -> WhereValue {
        WhereValue::Raw(self)
    }
}

impl IntoWhereValue for Subquery {
    fn into_where_value(self) -> WhereValue {
        WhereValue::Query(self)
    }
}

impl IntoWhereValue for Builder {
    fn into_where_value(self) -> WhereValue {
        WhereValue::Query(Subquery(SubquerySource::Query(Box::new(self))))
    }
}

impl IntoWhereValue for &Builder {
    fn into_where_value(self) -> WhereValue {
        WhereValue::Query(Subquery(SubquerySource::Query(Box::new(self.clone()))))
    }
}

/// Conversion into a quoted column reference (select/group/order/join roles).
pub trait IntoColumn {
    fn into_column(self) -> ColumnRef;
}

impl IntoColumn for ColumnRef {
    fn into_column(self) -> ColumnRef {
        self
    }
}

impl IntoColumn for &ColumnRef {
    fn into_column(self) -> ColumnRef {
        self.clone()
    }
}

impl IntoColumn for &str {
    fn into_column(self) -> ColumnRef {
        ColumnRef::parse(self)
    }
}

impl IntoColumn for String {
    fn into_column(self) -> ColumnRef {
        ColumnRef::parse(&self)
    }
}

/// Conversion into a named table reference.
pub trait IntoTable {
    fn into_table(self) -> TableRef;
}

impl IntoTable for TableRef {
    fn into_table(self) -> TableRef {
        self
    }
}

impl IntoTable for &str {
    fn into_table(self) -> TableRef {
        TableRef::parse(self)
    }
}

impl IntoTable for String {
    fn into_table(self) -> TableRef {
        TableRef::parse(&self)
    }
}

/// The right-hand side of an IN condition.
#[derive(Debug)]
pub enum InListSource {
    Values(Vec<Value>),
    Query(Subquery),
}

/// Conversion into an IN-list source: a list of values or a subquery.
pub trait IntoInList {
    fn into_in_list(self) -> InListSource;
}

macro_rules! impl_in_list {
    ($($t:ty),* $(,)?) => {$(
        impl IntoInList for Vec<$t> {
            fn into_in_list(self) -> InListSource {
                InListSource::Values(self.into_iter().map(Value::from).collect())
            }
        }

        impl<const N: usize> IntoInList for [$t; N] {
            fn into_in_list(self) -> InListSource {
                InListSource::Values(self.into_iter().map(Value::from).collect())
            }
        }
    )*};
}

impl_in_list!(i16, i32, i64, u32, f64, bool, &str, String, uuid::Uuid);

impl IntoInList for Vec<Value> {
    fn into_in_list(self) -> InListSource {
        InListSource::Values(self)
    }
}

impl IntoInList for Subquery {
    fn into_in_list(self) -> InListSource {
        InListSource::Query(self)
    }
}

impl IntoInList for Builder {
    fn into_in_list(self) -> InListSource {
        InListSource::Query(Subquery(SubquerySource::Query(Box::new(self))))
    }
}

impl IntoInList for &Builder {
    fn into_in_list(self) -> InListSource {
        InListSource::Query(Subquery(SubquerySource::Query(Box::new(self.clone()))))
    }
}

/// Conversion into a subquery argument (table position, EXISTS).
pub trait IntoSubquery {
    fn into_subquery(self) -> Subquery;
}

impl IntoSubquery for Subquery {
    fn into_subquery(self) -> Subquery {
        self
    }
}

impl IntoSubquery for Builder {
    fn into_subquery(self) -> Subquery {
        Subquery(SubquerySource::Query(Box::new(self)))
    }
}

impl IntoSubquery for &Builder {
    fn into_subquery(self) -> Subquery {
        Subquery(SubquerySource::Query(Box::new(self.clone())))
    }
}

/// A column assignment value for INSERT/UPDATE/upsert.
#[derive(Clone, Debug, PartialEq)]
pub enum SetValue {
    /// A literal, rendered as a placeholder.
    Value(Value),
    /// A raw SQL expression, e.g. `NOW()`.
    Raw(RawFragment),
}

/// Conversion into a [`SetValue`].
pub trait IntoSetValue {
    fn into_set_value(self) -> SetValue;
}

macro_rules! impl_set_value_scalar {
    ($($t:ty),* $(,)?) => {$(
        impl IntoSetValue for $t {
            fn into_set_value(self) -> SetValue {
                SetValue::Value(self.into())
            }
        }
    )*};
}

impl_set_value_scalar!(
    i8,
    i16,
    i32,
    i64,
    u16,
    u32,
    f32,
    f64,
    bool,
    &str,
    String,
    Vec<u8>,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    serde_json::Value,
    Value,
);

impl IntoSetValue for RawFragment {
    fn into_set_value(self) -> SetValue {
        SetValue::Raw(self)
    }
}

impl<T: IntoSetValue> IntoSetValue for Option<T> {
    fn into_set_value(self) -> SetValue {
        match self {
            Some(inner) => inner.into_set_value(),
            None => SetValue::Value(Value::Null),
        }
    }
}

/// Conversion into an ordered list of column assignments.
pub trait IntoAssignments {
    fn into_assignments(self) -> Vec<(String, SetValue)>;
}

impl<K, V> IntoAssignments for Vec<(K, V)>
where
    K: Into<String>,
    V: IntoSetValue,
{
    fn into_assignments(self) -> Vec<(String, SetValue)> {
        self.into_iter()
            .map(|(k, v)| (k.into(), v.into_set_value()))
            .collect()
    }
}

impl<K, V, const N: usize> IntoAssignments for [(K, V); N]
where
    K: Into<String>,
    V: IntoSetValue,
{
    fn into_assignments(self) -> Vec<(String, SetValue)> {
        self.into_iter()
            .map(|(k, v)| (k.into(), v.into_set_value()))
            .collect()
    }
}
