//! Option structures for bucket operations.
//!
//! The source API this layer descends from accepted either a bare version
//! number or an options record in the same parameter slot. Here the shapes
//! are normalized once, at the public boundary, into explicit structs with
//! builder-style setters; no internal logic re-inspects parameter shape.

use std::time::Duration;

/// Options for `Bucket::put`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Pin the written entry to this version instead of auto-incrementing.
    pub version: Option<u64>,
    /// Schedule the entry to expire this long after the write.
    pub ttl: Option<Duration>,
    /// Require the entry's current version to equal this for the write to
    /// succeed.
    pub if_version: Option<u64>,
    /// Suppress the change event.
    pub quiet: bool,
}

impl PutOptions {
    /// Default options: auto-versioned, no TTL, unconditional, notifying.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the written entry's version.
    pub fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Schedules expiration `ttl` after the write.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Makes the write conditional on the current version.
    pub fn if_version(mut self, version: u64) -> Self {
        self.if_version = Some(version);
        self
    }

    /// Suppresses the change event.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Options for `Bucket::remove`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Require the entry's current version to equal this for the delete to
    /// succeed.
    pub if_version: Option<u64>,
    /// Suppress the change event.
    pub quiet: bool,
}

impl RemoveOptions {
    /// Default options: unconditional, notifying.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the delete conditional on the current version.
    pub fn if_version(mut self, version: u64) -> Self {
        self.if_version = Some(version);
        self
    }

    /// Suppresses the change event.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Options for `Store::bucket`.
///
/// Index declarations are honored only on the first open of a bucket; a
/// later open with a different declaration is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketOptions {
    /// Field names to maintain equality indexes for.
    pub indexes: Vec<String>,
}

impl BucketOptions {
    /// Default options: no indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one indexed field.
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indexes.push(field.into());
        self
    }

    /// Replaces the indexed field list.
    pub fn indexes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes = fields.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_options_builder() {
        let options = PutOptions::new()
            .version(3)
            .ttl(Duration::from_millis(250))
            .if_version(2)
            .quiet();
        assert_eq!(options.version, Some(3));
        assert_eq!(options.ttl, Some(Duration::from_millis(250)));
        assert_eq!(options.if_version, Some(2));
        assert!(options.quiet);

        assert_eq!(PutOptions::new(), PutOptions::default());
    }

    #[test]
    fn test_remove_options_builder() {
        let options = RemoveOptions::new().if_version(4).quiet();
        assert_eq!(options.if_version, Some(4));
        assert!(options.quiet);
    }

    #[test]
    fn test_bucket_options_builder() {
        let options = BucketOptions::new().index("email").index("name");
        assert_eq!(options.indexes, vec!["email", "name"]);

        let options = BucketOptions::new().indexes(["a", "b"]);
        assert_eq!(options.indexes, vec!["a", "b"]);
    }
}
