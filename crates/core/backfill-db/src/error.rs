//! Error types for backfill tracking operations

use evm_schema::{DuplicateKeyError, SchemaValidationError, UnknownEnumValueError};

use crate::{BlockInterval, db::ConnError};

/// Errors that can occur when interacting with the backfill database
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),

    #[error(transparent)]
    RangeConflict(#[from] RangeConflictError),

    #[error("Error reading stored tag: {0}")]
    UnknownEnumValue(#[from] UnknownEnumValueError),

    #[error("Error decoding stored row: {0}")]
    Schema(#[from] SchemaValidationError),

    #[error(transparent)]
    DuplicateKey(#[from] DuplicateKeyError),

    #[error("Error connecting to backfill db: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Error running migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Error executing database query: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ConnError> for Error {
    fn from(err: ConnError) -> Self {
        match err {
            ConnError::ConnectionError(err) => Error::ConnectionError(err),
            ConnError::MigrationFailed(err) => Error::MigrationError(err),
        }
    }
}

impl Error {
    /// Returns `true` if the error is likely to be a transient connection issue.
    ///
    /// The following errors are considered connection errors:
    /// - `Error::ConnectionError`: the initial connection to the database failed.
    /// - `sqlx::Error::Io`: an I/O error, often a network issue or a closed socket.
    /// - `sqlx::Error::Tls`: the TLS handshake failed.
    /// - `sqlx::Error::PoolTimedOut`: no pooled connection became free in time.
    /// - `sqlx::Error::PoolClosed`: the pool was closed while an operation was pending.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::ConnectionError(_) => true,
            Error::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }

    /// Returns `true` if the operation can be retried from the beginning.
    ///
    /// Besides connection errors, this covers serialization failures (`40001`) and detected
    /// deadlocks (`40P01`). Range conflicts and invalid ranges are never retryable.
    pub fn is_retryable(&self) -> bool {
        if self.is_connection_error() {
            return true;
        }

        matches!(
            self,
            Error::Database(sqlx::Error::Database(err))
                if err.code().is_some_and(|code| matches!(
                    code.as_ref(),
                    "40001" | // serialization_failure
                    "40P01"   // deadlock_detected
                ))
        )
    }
}

/// A block range that cannot be tracked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRangeError {
    /// `start >= end`
    #[error("invalid block range [{start}, {end}): start must be below end")]
    Empty { start: u64, end: u64 },

    /// Block numbers are stored as signed 64-bit integers
    #[error("invalid block range [{start}, {end}): exceeds the storable block number {max}")]
    ExceedsStorageBounds { start: u64, end: u64, max: u64 },
}

/// Recording a range would merge it with a stored range whose metadata disagrees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("range {requested} conflicts with stored range {existing} for {key}: {reason}")]
pub struct RangeConflictError {
    pub key: String,
    pub existing: BlockInterval,
    pub requested: BlockInterval,
    pub reason: String,
}
