//! # fluentq
//!
//! A fluent, dialect-aware SQL query builder for Rust.
//!
//! ## Features
//!
//! - **Compile on demand**: a builder accumulates typed clause fragments
//!   and compiles them into one parameterized statement plus an ordered
//!   argument list; compilation is idempotent
//! - **Typed argument resolution**: literals, NULLs, lists, raw fragments,
//!   nested builders and deferred [`subquery`] callbacks all resolve
//!   through conversion traits, never runtime type switches
//! - **Condition trees**: AND/OR/NOT grouping with exact negation
//!   semantics (`IS NOT NULL`, `NOT IN`, `NOT BETWEEN`, `NOT (...)`)
//! - **Nested transactions**: depth-tracked savepoints behind a
//!   commit-on-ok/rollback-on-err `transaction(fn)` wrapper
//! - **Explicit configuration**: dialect, primary key and model descriptor
//!   travel in [`BuilderConfig`]; no global defaults
//!
//! ## Usage
//!
//! ```ignore
//! use fluentq::{Builder, PgExecutor};
//! use std::sync::Arc;
//!
//! let db = Builder::new(Arc::new(PgExecutor::new(client)));
//!
//! // SELECT
//! let rows = db
//!     .table("users")
//!     .where_eq("status", "active")
//!     .order_by_desc("created_at")
//!     .limit(20)
//!     .find()
//!     .await?;
//!
//! // INSERT
//! db.table("users")
//!     .create(vec![("username", "alice"), ("email", "alice@example.com")])
//!     .await?;
//!
//! // Nested transaction with savepoints
//! db.transaction(|tx| async move {
//!     tx.table("accounts")
//!         .where_eq("id", 1)
//!         .update(vec![("balance", 100)])
//!         .await?;
//!     Ok(())
//! })
//! .await?;
//! ```

pub mod builder;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod expr;
pub mod ident;
pub mod operand;
pub mod row;
pub mod statement;
mod transaction;
pub mod value;

#[cfg(feature = "postgres")]
pub mod pg;

pub use builder::Builder;
pub use config::{BuilderConfig, ModelDescriptor};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use executor::Executor;
pub use expr::{Combinator, ConditionTree, Expr};
pub use ident::{ColumnRef, TableRef};
pub use operand::{
    subquery, InListSource, IntoAssignments, IntoColumn, IntoInList, IntoSetValue, IntoSubquery,
    IntoTable, IntoWhereValue, Operand, SetValue, Subquery, WhereValue,
};
pub use row::{FromRow, Row};
pub use statement::{CompiledStatement, RawFragment};
pub use value::{FromValue, Value};

#[cfg(feature = "postgres")]
pub use pg::PgExecutor;
