//! Change event types.

use std::time::Duration;

use bytes::Bytes;

/// The mutation kind an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// An entry was written.
    Put,
    /// An entry was deleted.
    Remove,
}

/// A notification describing one mutation.
///
/// For a put, `value` is the encoded value that was written and `version` is
/// the version assigned by the write. For a remove, `value` is the encoded
/// pre-deletion value and `version` the removed entry's version. `ttl` is
/// present when the put scheduled an expiration.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// The mutation kind.
    pub op: ChangeOp,
    /// The bucket that was mutated.
    pub bucket: String,
    /// The key that was mutated.
    pub id: String,
    /// The encoded value involved in the mutation.
    pub value: Option<Bytes>,
    /// The entry version involved in the mutation.
    pub version: Option<u64>,
    /// The time-to-live requested by the put, if any.
    pub ttl: Option<Duration>,
}
