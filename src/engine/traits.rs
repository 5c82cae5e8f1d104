//! The engine contract the store layers on.

use bytes::Bytes;

use crate::error::Result;

/// A stored value together with its version number.
///
/// Versions drive optimistic concurrency: a conditional write names the
/// version it expects and fails with a version conflict when the stored
/// version differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedEntry {
    /// The encoded value.
    pub value: Bytes,
    /// The entry's current version.
    pub version: u64,
}

impl VersionedEntry {
    /// Creates an entry at an explicit version.
    pub fn new(value: Bytes, version: u64) -> Self {
        Self { value, version }
    }
}

/// A half-open key range `[start, end)` for ordered scans.
///
/// `None` bounds are unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRange {
    /// Inclusive lower bound.
    pub start: Option<String>,
    /// Exclusive upper bound.
    pub end: Option<String>,
}

impl ScanRange {
    /// The unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    /// Everything strictly below `end`.
    pub fn up_to(end: impl Into<String>) -> Self {
        Self {
            start: None,
            end: Some(end.into()),
        }
    }

    /// Everything at or above `start`.
    pub fn from(start: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: None,
        }
    }

    /// Every key starting with `prefix`.
    ///
    /// The upper fence appends `U+00FF` to the prefix, which bounds the scan
    /// as long as keys stay below that code point at the boundary position.
    /// Composite keys built by this crate satisfy the constraint.
    pub fn prefix(prefix: &str) -> Self {
        Self {
            start: Some(prefix.to_string()),
            end: Some(format!("{prefix}\u{ff}")),
        }
    }

    /// Whether `key` falls inside the range.
    pub fn contains(&self, key: &str) -> bool {
        if let Some(start) = &self.start {
            if key < start.as_str() {
                return false;
            }
        }
        if let Some(end) = &self.end {
            if key >= end.as_str() {
                return false;
            }
        }
        true
    }
}

/// One named ordered keyspace inside the engine.
///
/// All reads observe committed state plus any writes issued earlier in the
/// current transaction. Conditional semantics:
///
/// - `if_version = Some(v)` requires an existing entry at version `v`; an
///   absent entry is a conflict.
/// - `put` with `version = None` auto-assigns `previous + 1` (1 for a fresh
///   key); `Some(v)` pins the stored version to `v`.
pub trait KvPartition: Send + Sync {
    /// The partition's name.
    fn name(&self) -> &str;

    /// Reads a single entry.
    fn get(&self, key: &str) -> Result<Option<VersionedEntry>>;

    /// Writes an entry, optionally pinning its version and optionally
    /// conditioning on the current version. Returns the version assigned to
    /// the written entry.
    fn put(
        &self,
        key: &str,
        value: Bytes,
        version: Option<u64>,
        if_version: Option<u64>,
    ) -> Result<u64>;

    /// Removes an entry, optionally conditioning on the current version.
    /// Returns whether the entry existed.
    fn remove(&self, key: &str, if_version: Option<u64>) -> Result<bool>;

    /// Bulk point lookup; the result is positionally aligned with `keys`.
    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<VersionedEntry>>>;

    /// All keys inside `range`, in order.
    fn get_keys(&self, range: &ScanRange) -> Result<Vec<String>>;

    /// All entries inside `range`, in key order.
    fn get_range(&self, range: &ScanRange) -> Result<Vec<(String, VersionedEntry)>>;

    /// Releases the partition handle. Idempotent.
    fn close(&self) -> Result<()>;
}

/// The engine environment: a set of named partitions plus a multi-key
/// transaction primitive.
pub trait KvEngine: Send + Sync {
    /// The partition handle type.
    type Partition: KvPartition;

    /// Opens (or creates) a named partition.
    fn open_partition(&self, name: &str) -> Result<Self::Partition>;

    /// Runs `f` atomically: every partition write issued inside `f` becomes
    /// visible all-or-nothing. An `Err` from `f` rolls the transaction back
    /// and propagates.
    ///
    /// Transactions are reentrant: a transaction begun inside another joins
    /// the outer one, committing or rolling back with it.
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>;

    /// Closes the environment. Idempotent.
    fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_range_contains() {
        let range = ScanRange {
            start: Some("b".to_string()),
            end: Some("d".to_string()),
        };
        assert!(!range.contains("a"));
        assert!(range.contains("b"));
        assert!(range.contains("c"));
        assert!(!range.contains("d"));

        assert!(ScanRange::all().contains("anything"));
        assert!(ScanRange::up_to("m").contains("a"));
        assert!(!ScanRange::up_to("m").contains("m"));
    }

    #[test]
    fn test_scan_range_prefix() {
        let range = ScanRange::prefix("users:email:x@y.com:");
        assert!(range.contains("users:email:x@y.com:user:1"));
        assert!(!range.contains("users:email:x@y.net:user:2"));
        assert!(!range.contains("users:email:x@y.co"));
    }
}
