//! The executor capability boundary.
//!
//! A builder is bound to an `Arc<dyn Executor>` for its whole lifetime;
//! everything it ever asks of the underlying engine goes through this
//! trait. The builder never retries: executor failures propagate unchanged.

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Capability contract the builder consumes from the relational engine.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a statement that returns rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement and return the affected row count.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64>;

    /// Open a true transaction.
    async fn begin(&self) -> Result<()>;

    /// Commit the current true transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the current true transaction.
    async fn rollback(&self) -> Result<()>;

    /// Create a named savepoint inside an open transaction.
    async fn savepoint(&self, name: &str) -> Result<()>;

    /// Release (commit) a named savepoint.
    async fn release_savepoint(&self, name: &str) -> Result<()>;

    /// Roll back to a named savepoint.
    async fn rollback_to_savepoint(&self, name: &str) -> Result<()>;

    /// The dialect this executor's engine speaks; drives quoting and
    /// placeholder style in builders bound to it.
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    /// Quote an identifier the way this executor's engine expects.
    fn quote_identifier(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A recording executor used by builder and transaction tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;

    /// Records every dispatched statement and serves canned query results.
    #[derive(Default)]
    pub(crate) struct RecordingExecutor {
        /// Every statement in issuance order: `(sql, args)`. Transaction
        /// verbs are recorded with empty argument lists.
        pub log: Mutex<Vec<(String, Vec<Value>)>>,
        /// Queued results for `query` calls, served front to back.
        pub results: Mutex<VecDeque<Vec<Row>>>,
        /// When set, any statement whose text contains this substring fails.
        pub fail_on: Mutex<Option<String>>,
        pub dialect: Dialect,
    }

    impl RecordingExecutor {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn queue_result(&self, rows: Vec<Row>) {
            self.results.lock().unwrap().push_back(rows);
        }

        pub(crate) fn fail_on(&self, needle: &str) {
            *self.fail_on.lock().unwrap() = Some(needle.to_string());
        }

        pub(crate) fn statements(&self) -> Vec<String> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .map(|(sql, _)| sql.clone())
                .collect()
        }

        pub(crate) fn last_args(&self) -> Vec<Value> {
            self.log
                .lock()
                .unwrap()
                .last()
                .map(|(_, args)| args.clone())
                .unwrap_or_default()
        }

        fn record(&self, sql: &str, args: &[Value]) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push((sql.to_string(), args.to_vec()));
            if let Some(needle) = self.fail_on.lock().unwrap().as_deref() {
                if sql.contains(needle) {
                    return Err(Error::execution(format!("forced failure on {sql}")));
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
            self.record(sql, args)?;
            Ok(self
                .results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }

        async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
            self.record(sql, args)?;
            Ok(1)
        }

        async fn begin(&self) -> Result<()> {
            self.record("BEGIN", &[])
        }

        async fn commit(&self) -> Result<()> {
            self.record("COMMIT", &[])
        }

        async fn rollback(&self) -> Result<()> {
            self.record("ROLLBACK", &[])
        }

        async fn savepoint(&self, name: &str) -> Result<()> {
            self.record(&format!("SAVEPOINT {name}"), &[])
        }

        async fn release_savepoint(&self, name: &str) -> Result<()> {
            self.record(&format!("RELEASE SAVEPOINT {name}"), &[])
        }

        async fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
            self.record(&format!("ROLLBACK TO SAVEPOINT {name}"), &[])
        }

        fn dialect(&self) -> Dialect {
            self.dialect
        }
    }
}
