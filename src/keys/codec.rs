//! Encoding and decoding of synthetic composite keys.

use serde_json::Value;

/// Reserved delimiter for composite-key tuples. Bucket and index names must
/// not contain it.
pub const DELIMITER: char = ':';

/// A decoded TTL entry key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlRef {
    /// Expiration timestamp in epoch milliseconds.
    pub expiration: u64,
    /// Name of the bucket owning the entry.
    pub bucket: String,
    /// Key of the entry scheduled to expire.
    pub key: String,
}

/// Encodes a TTL entry key: `<expiration>:<bucket>:<key>`.
///
/// Epoch-millisecond timestamps are equal-width decimal strings for the
/// supported epoch range, so the lexical order of the TTL partition is
/// expiration order. That ordering is what makes a sweep proportional to the
/// number of expired entries instead of a full scan.
pub fn ttl_key(expiration: u64, bucket: &str, key: &str) -> String {
    format!("{expiration}{DELIMITER}{bucket}{DELIMITER}{key}")
}

/// Decodes a TTL entry key.
///
/// Returns `None` for keys that do not split into at least three segments or
/// whose leading segment is not a timestamp. Sweeps skip such keys instead of
/// failing, to tolerate format drift in the TTL partition.
pub fn parse_ttl_key(raw: &str) -> Option<TtlRef> {
    let mut parts = raw.splitn(3, DELIMITER);
    let expiration = parts.next()?.parse().ok()?;
    let bucket = parts.next()?;
    // The final segment is the entry key verbatim; it may itself contain the
    // delimiter.
    let key = parts.next()?;
    Some(TtlRef {
        expiration,
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

/// Encodes an index entry key: `<bucket>:<index>:<value>:<key>`.
pub fn index_key(bucket: &str, index: &str, value: &str, key: &str) -> String {
    format!("{bucket}{DELIMITER}{index}{DELIMITER}{value}{DELIMITER}{key}")
}

/// Encodes the scan prefix bounding one equality class:
/// `<bucket>:<index>:<value>:`.
pub fn index_prefix(bucket: &str, index: &str, value: &str) -> String {
    format!("{bucket}{DELIMITER}{index}{DELIMITER}{value}{DELIMITER}")
}

/// Derives the indexable representation of a field value.
///
/// Only scalar fields participate in indexing: strings index as themselves,
/// numbers and booleans by their canonical display form. `null`, arrays, and
/// objects produce no index entry.
pub fn index_field_repr(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
