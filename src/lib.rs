//! # StrataKV - A Layered Bucket Store over an Ordered Key-Value Engine
//!
//! StrataKV wraps an ordered, transactional key-value engine and layers four
//! capabilities on top of it, all encoded as ordinary key-value entries and
//! reconciled through range scans and multi-key transactions:
//!
//! - **Optimistic Concurrency**: every entry carries a version number;
//!   conditional writes fail with a version conflict instead of clobbering.
//! - **Passive TTL Expiry**: puts can schedule an expiration; a `clean()`
//!   call sweeps expired entries transactionally. No background timer thread.
//! - **Secondary Indexes**: equality lookups on declared fields, maintained
//!   synchronously with every mutation.
//! - **Change Notification**: every non-quiet mutation notifies registered
//!   observers synchronously.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             Store                                 │
//! │                                                                   │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────────────┐   │
//! │  │  Bucket    │──>│ TTL sweep  │   │     ChangeNotifier       │   │
//! │  │  wrapper   │   │  clean()   │   │  (synchronous observers) │   │
//! │  └─────┬──────┘   └─────┬──────┘   └──────────────────────────┘   │
//! │        │                │                                         │
//! │        ▼                ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────┐  │
//! │  │                     KvEngine (trait)                        │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────────────┐  │  │
//! │  │  │ bucket  │ │ bucket  │ │  "ttl"  │ │      "index"      │  │  │
//! │  │  │ "users" │ │ "orders"│ │ markers │ │  reverse lookups  │  │  │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └───────────────────┘  │  │
//! │  └─────────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! # fn main() -> stratakv::Result<()> {
//! use serde::{Deserialize, Serialize};
//! use stratakv::{BucketOptions, MemoryEngine, PutOptions, RemoveOptions, Store};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     email: String,
//! }
//!
//! let store = Store::open(MemoryEngine::new())?;
//! let users = store.bucket("users", BucketOptions::new().index("email"))?;
//!
//! users.put(
//!     "user:1",
//!     &User { email: "ada@example.com".to_string() },
//!     PutOptions::new(),
//! )?;
//!
//! let hits: Vec<User> = users.query("email", "ada@example.com")?;
//! assert_eq!(hits.len(), 1);
//!
//! users.remove("user:1", RemoveOptions::new())?;
//! let hits: Vec<User> = users.query("email", "ada@example.com")?;
//! assert!(hits.is_empty());
//! # store.close()
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`engine`]: the engine traits and the in-memory reference engine
//! - [`keys`]: the composite key codec for TTL and index entries
//! - [`store`]: the store, bucket wrapper, options, and TTL sweep
//! - [`events`]: change event types and the observer registry
//! - [`error`]: the error taxonomy
//!
//! ## Design Highlights
//!
//! ### Everything is a key-value entry
//!
//! TTL schedules and index postings live in two reserved partitions, keyed
//! so that ordered range scans answer the interesting questions: "what has
//! expired as of now?" is a scan of the `ttl` partition bounded by the
//! current timestamp, and "which entries have field F = v?" is a prefix scan
//! of the `index` partition.
//!
//! ### Mutations are transactional
//!
//! A `put` is one engine transaction covering the versioned write, the TTL
//! marker, and index reconciliation. A version conflict therefore has no
//! partial side effects, and a sweep commits entry and marker removals
//! together.
//!
//! ### Expiry is passive
//!
//! Nothing runs until `clean()` is called; wire it to whatever scheduler the
//! application already has. Concurrent `clean()` calls are dropped by a
//! cooperative guard rather than queued.

pub mod engine;
pub mod error;
pub mod events;
pub mod keys;
pub mod store;

// Re-export commonly used types for convenience
pub use engine::{EngineStats, KvEngine, KvPartition, MemoryEngine, ScanRange, VersionedEntry};
pub use error::{Result, StoreError};
pub use events::{ChangeEvent, ChangeNotifier, ChangeOp, ObserverId};
pub use store::{
    Bucket, BucketOptions, PutOptions, RemoveOptions, Store, INDEX_PARTITION, TTL_PARTITION,
};

/// Version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
