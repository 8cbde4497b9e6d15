//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur while opening or mutating the store.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine or transaction error. Covers commit failures, primary-key
    /// collisions under [`UpdatePolicy::Error`](crate::UpdatePolicy::Error),
    /// and constraint violations.
    #[error("store error: {0}")]
    Database(String),

    /// The on-disk schema version does not match the configured version and
    /// the recovery policy is strict.
    #[error("incompatible schema: store has version {on_disk}, expected {expected}")]
    IncompatibleSchema {
        /// Version recorded in the store.
        on_disk: u32,
        /// Version declared by the configuration.
        expected: u32,
    },

    /// IO error while probing or discarding the store file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

// Compile-time check that Error is Send + Sync for thread-safe error propagation.
// This function is never called but will fail to compile if the bound is not satisfied.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
