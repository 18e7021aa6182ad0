//! Transaction and savepoint management.
//!
//! Depth is tracked per builder lineage: `begin()` at depth 0 opens a true
//! transaction, every nested `begin()` issues a uniquely-named savepoint
//! instead, and commit/rollback walk back down exactly one level. Each
//! `begin()` returns a *new* builder that shares the executor handle but
//! owns independent clause state, so nested transactions never alias
//! clause lists.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::debug;

use crate::builder::Builder;
use crate::error::{Error, Result};
use crate::executor::Executor;

/// Name of the savepoint guarding the transition from `level` to
/// `level + 1`; the first nested begin creates `sp1`.
pub(crate) fn savepoint_name(level: u32) -> String {
    format!("sp{level}")
}

impl Builder {
    /// Current transaction nesting depth (0 = no transaction).
    pub fn transaction_depth(&self) -> u32 {
        self.tx_depth
    }

    /// Open a transaction (or a savepoint when one is already open) and
    /// return a new builder at the next depth, sharing this connection.
    pub async fn begin(&self) -> Result<Builder> {
        if self.tx_depth == 0 {
            self.exec.begin().await?;
        } else {
            self.exec.savepoint(&savepoint_name(self.tx_depth)).await?;
        }
        debug!(depth = self.tx_depth + 1, "transaction begin");
        let mut tx = self.fresh();
        tx.tx_depth = self.tx_depth + 1;
        Ok(tx)
    }

    /// Commit this level: a true COMMIT at depth 1, a savepoint release
    /// further down. Failures are fatal and surfaced unchanged.
    pub async fn commit(self) -> Result<()> {
        debug!(depth = self.tx_depth, "transaction commit");
        finish_commit(&self.exec, self.tx_depth).await
    }

    /// Roll back this level: a true ROLLBACK at depth 1, a rollback to the
    /// savepoint further down.
    pub async fn rollback(self) -> Result<()> {
        debug!(depth = self.tx_depth, "transaction rollback");
        finish_rollback(&self.exec, self.tx_depth).await
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err` or
    /// panic. Nesting is legal and uses the savepoint path.
    ///
    /// A commit/rollback failure replaces the callback's error, but the
    /// callback error stays observable through
    /// [`Error::original`](crate::Error::original).
    pub async fn transaction<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Builder) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let tx = self.begin().await?;
        let exec = Arc::clone(&tx.exec);
        let depth = tx.tx_depth;

        let outcome = AssertUnwindSafe(f(tx)).catch_unwind().await;
        match outcome {
            Ok(Ok(value)) => {
                finish_commit(&exec, depth).await?;
                Ok(value)
            }
            Ok(Err(err)) => match finish_rollback(&exec, depth).await {
                Ok(()) => Err(err),
                Err(Error::Transaction { action, source, .. }) => Err(Error::Transaction {
                    action,
                    source,
                    original: Some(Box::new(err)),
                }),
                Err(other) => Err(Error::Transaction {
                    action: "rollback",
                    source: Box::new(other),
                    original: Some(Box::new(err)),
                }),
            },
            Err(panic) => {
                // Roll back before resuming the unwind; a rollback failure
                // cannot outrank the panic itself.
                let _ = finish_rollback(&exec, depth).await;
                std::panic::resume_unwind(panic)
            }
        }
    }
}

async fn finish_commit(exec: &Arc<dyn Executor>, depth: u32) -> Result<()> {
    match depth {
        0 => Err(Error::transaction(
            "commit",
            Error::execution("no active transaction"),
        )),
        1 => exec
            .commit()
            .await
            .map_err(|e| Error::transaction("commit", e)),
        n => exec
            .release_savepoint(&savepoint_name(n - 1))
            .await
            .map_err(|e| Error::transaction("commit", e)),
    }
}

async fn finish_rollback(exec: &Arc<dyn Executor>, depth: u32) -> Result<()> {
    match depth {
        0 => Err(Error::transaction(
            "rollback",
            Error::execution("no active transaction"),
        )),
        1 => exec
            .rollback()
            .await
            .map_err(|e| Error::transaction("rollback", e)),
        n => exec
            .rollback_to_savepoint(&savepoint_name(n - 1))
            .await
            .map_err(|e| Error::transaction("rollback", e)),
    }
}
