//! Error types for fluentq

use thiserror::Error;

/// Result type alias for fluentq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum Error {
    /// Unsupported input shape for a builder role (programmer error)
    #[error("invalid argument for {role}: {message}")]
    InvalidArgument {
        role: &'static str,
        message: String,
    },

    /// A table-position subquery was supplied without an alias
    #[error("subquery in table position requires a non-empty alias")]
    EmptySubqueryAlias,

    /// No table was set and no model descriptor supplies one
    #[error("no table set and no model descriptor bound")]
    MissingTable,

    /// A terminal verb already ran on this builder
    #[error("builder already executed a terminal verb")]
    BuilderConsumed,

    /// UPDATE/DELETE without WHERE conditions
    #[error("{verb} without WHERE conditions; call allow_unguarded() to permit")]
    UnguardedMutation { verb: &'static str },

    /// Row decode/mapping error
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Row not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure reported by the executor capability
    #[error("execution error: {0}")]
    Execution(String),

    /// Database error from the tokio-postgres executor
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Failure while issuing COMMIT/ROLLBACK or a savepoint equivalent.
    ///
    /// When the failure happened while unwinding a `transaction(fn)` callback
    /// that itself returned an error, that callback error is preserved in
    /// `original`.
    #[error("transaction {action} failed: {source}")]
    Transaction {
        action: &'static str,
        #[source]
        source: Box<Error>,
        original: Option<Box<Error>>,
    },
}

impl Error {
    /// Create an invalid-argument error for a resolver role
    pub fn invalid_argument(role: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            role,
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Wrap a commit/rollback dispatch failure
    pub fn transaction(action: &'static str, source: Error) -> Self {
        Self::Transaction {
            action,
            source: Box::new(source),
            original: None,
        }
    }

    /// Check if this is an invalid-argument (programmer) error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The callback error that a transaction commit/rollback failure replaced, if any
    pub fn original(&self) -> Option<&Error> {
        match self {
            Self::Transaction { original, .. } => original.as_deref(),
            _ => None,
        }
    }
}
