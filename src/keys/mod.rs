//! Composite Key Codec
//!
//! Synthetic keys for TTL and index entries are colon-delimited tuples:
//!
//! ```text
//! TTL entry:    <epoch-millis>:<bucket>:<key>        (value: empty)
//! Index entry:  <bucket>:<index>:<value>:<key>       (value: the entry key)
//! ```
//!
//! Both partitions are key-ordered, so these encodings carry the semantics:
//! a range scan of the TTL partition bounded by "now" yields exactly the
//! expired entries in expiration order, and a prefix scan of the index
//! partition over `<bucket>:<index>:<value>:` bounds a single equality class.
//!
//! The colon delimiter is reserved: bucket names and index names must not
//! contain it. Entry keys may, because they always occupy the final position
//! of a tuple and are re-joined on decode.

pub mod codec;

// Re-export the codec surface.
pub use codec::{index_field_repr, index_key, index_prefix, parse_ttl_key, ttl_key, TtlRef, DELIMITER};
