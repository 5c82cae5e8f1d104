//! Ordered Key-Value Engine
//!
//! The store layers its semantics (versioned writes, TTL expiry, secondary
//! indexes, change events) on top of an ordered, transactional key-value
//! engine. The engine is an external collaborator described by two traits:
//!
//! - [`KvEngine`]: opens named partitions, runs multi-key transactions, and
//!   closes the environment.
//! - [`KvPartition`]: one named ordered keyspace with versioned conditional
//!   `put`/`remove`, bulk reads, and range scans.
//!
//! ## Reference engine
//!
//! [`MemoryEngine`] is the in-process reference implementation: ordered
//! `BTreeMap` partitions behind read-write locks, a reentrant single-writer
//! transaction lock, and whole-partition snapshots as the undo log. It is
//! what the test suite and benchmarks run against, and it is usable as a
//! standalone in-memory store. Durable engines (LMDB and friends) plug in by
//! implementing the same two traits.

pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use memory::{EngineStats, MemoryEngine, MemoryPartition};
pub use traits::{KvEngine, KvPartition, ScanRange, VersionedEntry};
