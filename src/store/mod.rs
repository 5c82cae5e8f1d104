//! Store and Bucket Layer
//!
//! This module holds the layering logic itself:
//!
//! - [`Store`]: owns the engine, the bucket and index registries, the
//!   reserved `ttl` and `index` partitions, the sweep guard, and the change
//!   notifier.
//! - [`Bucket`]: the wrapper a caller mutates through. Every `put`/`remove`
//!   runs inside one engine transaction that performs the versioned write
//!   together with TTL-entry and index-entry maintenance, then emits a
//!   change event unless the operation was quiet.
//! - sweep: `clean()`/`clean_at()` remove expired entries transactionally,
//!   guarded against concurrent invocation.
//!
//! ## Layout inside the engine
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        KvEngine                              │
//! │  ┌───────────┐ ┌───────────┐   ┌─────────┐ ┌─────────────┐  │
//! │  │ "users"   │ │ "orders"  │   │  "ttl"  │ │   "index"   │  │
//! │  │ bucket    │ │ bucket    │ … │ markers │ │ reverse map │  │
//! │  └───────────┘ └───────────┘   └─────────┘ └─────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! One partition per logical bucket, plus the two reserved partitions whose
//! names user buckets may not take.

pub mod bucket;
pub mod core;
pub mod options;
pub mod sweep;

// Re-export commonly used types
pub use self::bucket::Bucket;
pub use self::core::{Store, INDEX_PARTITION, TTL_PARTITION};
pub use self::options::{BucketOptions, PutOptions, RemoveOptions};
