//! Error types for the store.
//!
//! All fallible operations in this crate return [`Result`], an alias over
//! [`StoreError`]. Two conditions are deliberately *not* errors: stale index
//! references (filtered silently during `query`) and malformed TTL keys
//! (skipped during a sweep). Everything else surfaces to the caller.

use thiserror::Error;

/// The error taxonomy of the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A conditional `put` or `remove` was issued with an `if_version` that
    /// does not match the entry's stored version. The operation has no side
    /// effects: the entry, its index entries, and its TTL entries are left
    /// untouched.
    #[error("version conflict on {bucket:?}:{key:?}")]
    VersionConflict {
        /// The bucket (or reserved partition) the write targeted.
        bucket: String,
        /// The key the write targeted.
        key: String,
    },

    /// `query` was called with an index name that was never declared for the
    /// bucket.
    #[error("no index {index:?} declared on bucket {bucket:?}")]
    UnknownIndex {
        /// The bucket being queried.
        bucket: String,
        /// The undeclared index name.
        index: String,
    },

    /// A later `bucket()` call declared a different set of indexes than the
    /// first open. Index declarations are first-open-wins and immutable.
    #[error("indexes for bucket {0:?} differ from the first declaration")]
    IndexRedeclaration(String),

    /// The bucket name is empty, contains the composite-key delimiter, or
    /// collides with a reserved partition name.
    #[error("invalid bucket name {0:?}")]
    InvalidBucketName(String),

    /// The store (or its engine) has been closed.
    #[error("store is closed")]
    Closed,

    /// Encoding or decoding a bucket value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An engine-level fault (I/O, transaction failure, ...).
    #[error("engine error: {0}")]
    Engine(String),

    /// Escape hatch for foreign engine implementations.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Convenience constructor used at codec boundaries.
    pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_stable() {
        let err = StoreError::VersionConflict {
            bucket: "users".to_string(),
            key: "user:1".to_string(),
        };
        assert_eq!(err.to_string(), "version conflict on \"users\":\"user:1\"");

        let err = StoreError::UnknownIndex {
            bucket: "users".to_string(),
            index: "email".to_string(),
        };
        assert!(err.to_string().contains("email"));
    }

    #[test]
    fn anyhow_errors_convert() {
        let err: StoreError = anyhow::anyhow!("backend exploded").into();
        assert!(matches!(err, StoreError::Other(_)));
    }
}
