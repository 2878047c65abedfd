//! Error handling for docgraph-store
//!
//! Wraps docgraph-core `DgError` with driver-specific helpers

use docgraph_core::errors::{DgError, DgErrorKind};
use mongodb::error::{ErrorKind, WriteFailure};

pub use docgraph_core::errors::Result;

/// Server error code for a unique index violation
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Map a driver error onto the canonical kinds
///
/// Never produces `NotFound`; "no document" is decided by the caller from an
/// empty result, not from a driver failure.
pub fn from_mongo(op: &str, err: mongodb::error::Error) -> DgError {
    let kind = match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            DgErrorKind::Connection
        }
        ErrorKind::Transaction { .. } => DgErrorKind::Transaction,
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            DgErrorKind::DuplicateKey
        }
        ErrorKind::BulkWrite(failure)
            if failure
                .write_errors
                .as_ref()
                .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY_CODE)) =>
        {
            DgErrorKind::DuplicateKey
        }
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            DgErrorKind::Serialization
        }
        ErrorKind::InvalidArgument { .. } => DgErrorKind::InvalidInput,
        _ => DgErrorKind::Persistence,
    };

    DgError::new(kind)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// Create an error for a configuration source that could not be loaded
pub fn config_error(operation: &str, err: config::ConfigError) -> DgError {
    DgError::new(DgErrorKind::InvalidConfig)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create a duplicate key error
pub fn duplicate_key(collection: &str, key: &str) -> DgError {
    DgError::new(DgErrorKind::DuplicateKey)
        .with_collection(collection.to_string())
        .with_message(format!(
            "E{} duplicate key error collection: {} dup key: {}",
            DUPLICATE_KEY_CODE, collection, key
        ))
}

/// Create an error for a query or update shape the backend does not handle
pub fn unsupported(operation: &str, what: &str) -> DgError {
    DgError::new(DgErrorKind::InvalidInput)
        .with_op(operation.to_string())
        .with_message(format!("unsupported {}", what))
}

/// Create an error for a poisoned internal lock
pub fn poisoned(operation: &str) -> DgError {
    DgError::new(DgErrorKind::Internal)
        .with_op(operation.to_string())
        .with_message("store state lock poisoned")
}
