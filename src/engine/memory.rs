//! In-Memory Reference Engine
//!
//! Ordered partitions backed by `BTreeMap`, one read-write lock per
//! partition, and a reentrant single-writer transaction lock. The undo log
//! is a whole-partition snapshot taken when the outermost transaction
//! begins; an error anywhere inside restores every partition to that
//! snapshot, so multi-key mutations are all-or-nothing.
//!
//! ## Concurrency Model
//!
//! The engine assumes a single logical writer. Writers (including
//! transactions) serialize on the reentrant lock; the lock is reentrant so a
//! write issued inside a transaction on the same thread joins it instead of
//! deadlocking. Readers take only the per-partition lock and may observe
//! in-flight transaction state from other threads, which is acceptable for a
//! reference engine driven by one writer.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::debug;

use crate::engine::traits::{KvEngine, KvPartition, ScanRange, VersionedEntry};
use crate::error::{Result, StoreError};

type Tree = BTreeMap<String, VersionedEntry>;

/// Undo state for the outermost open transaction.
#[derive(Default)]
struct TxnState {
    depth: usize,
    snapshot: Option<HashMap<String, Tree>>,
}

/// State shared between the engine handle and its partition handles.
struct Shared {
    partitions: RwLock<HashMap<String, Arc<RwLock<Tree>>>>,
    /// Reentrant so nested transactions (and writes inside a transaction)
    /// join the outer one on the same thread.
    txn: ReentrantMutex<RefCell<TxnState>>,
    closed: AtomicBool,

    // Operation counters, relaxed because they are statistics only.
    put_count: AtomicU64,
    get_count: AtomicU64,
    remove_count: AtomicU64,
    txn_count: AtomicU64,
}

impl Shared {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Clones every partition's tree as the transaction undo log.
    fn snapshot_all(&self) -> HashMap<String, Tree> {
        self.partitions
            .read()
            .iter()
            .map(|(name, tree)| (name.clone(), tree.read().clone()))
            .collect()
    }

    /// Restores every partition to `snapshot`. Partitions created after the
    /// snapshot was taken are cleared.
    fn restore(&self, mut snapshot: HashMap<String, Tree>) {
        let partitions = self.partitions.read();
        for (name, tree) in partitions.iter() {
            let mut tree = tree.write();
            match snapshot.remove(name) {
                Some(saved) => *tree = saved,
                None => tree.clear(),
            }
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    /// Number of open partitions.
    pub partitions: usize,
    /// Total put operations.
    pub put_ops: u64,
    /// Total point/bulk read operations.
    pub get_ops: u64,
    /// Total remove operations.
    pub remove_ops: u64,
    /// Total completed outermost transactions (committed or rolled back).
    pub transactions: u64,
}

/// The in-memory reference engine.
///
/// # Example
///
/// ```
/// use stratakv::engine::{KvEngine, KvPartition, MemoryEngine};
/// use bytes::Bytes;
///
/// let engine = MemoryEngine::new();
/// let users = engine.open_partition("users").unwrap();
///
/// let version = users.put("user:1", Bytes::from("ada"), None, None).unwrap();
/// assert_eq!(version, 1);
/// assert_eq!(users.get("user:1").unwrap().unwrap().value, Bytes::from("ada"));
/// ```
pub struct MemoryEngine {
    inner: Arc<Shared>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("partitions", &self.inner.partitions.read().len())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                partitions: RwLock::new(HashMap::new()),
                txn: ReentrantMutex::new(RefCell::new(TxnState::default())),
                closed: AtomicBool::new(false),
                put_count: AtomicU64::new(0),
                get_count: AtomicU64::new(0),
                remove_count: AtomicU64::new(0),
                txn_count: AtomicU64::new(0),
            }),
        }
    }

    /// Returns engine statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            partitions: self.inner.partitions.read().len(),
            put_ops: self.inner.put_count.load(Ordering::Relaxed),
            get_ops: self.inner.get_count.load(Ordering::Relaxed),
            remove_ops: self.inner.remove_count.load(Ordering::Relaxed),
            transactions: self.inner.txn_count.load(Ordering::Relaxed),
        }
    }
}

impl KvEngine for MemoryEngine {
    type Partition = MemoryPartition;

    fn open_partition(&self, name: &str) -> Result<Self::Partition> {
        self.inner.ensure_open()?;
        let tree = {
            let mut partitions = self.inner.partitions.write();
            Arc::clone(
                partitions
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(RwLock::new(Tree::new()))),
            )
        };
        Ok(MemoryPartition {
            name: name.to_string(),
            tree,
            shared: Arc::clone(&self.inner),
        })
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        self.inner.ensure_open()?;
        let guard = self.inner.txn.lock();
        {
            let mut state = guard.borrow_mut();
            if state.depth == 0 {
                state.snapshot = Some(self.inner.snapshot_all());
            }
            state.depth += 1;
        }

        let result = f();

        let mut state = guard.borrow_mut();
        state.depth -= 1;
        if state.depth == 0 {
            let snapshot = state.snapshot.take();
            drop(state);
            if result.is_err() {
                if let Some(snapshot) = snapshot {
                    debug!("transaction rolled back");
                    self.inner.restore(snapshot);
                }
            }
            self.inner.txn_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A handle to one ordered in-memory partition.
pub struct MemoryPartition {
    name: String,
    tree: Arc<RwLock<Tree>>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPartition")
            .field("name", &self.name)
            .field("len", &self.tree.read().len())
            .finish()
    }
}

fn range_bounds(range: &ScanRange) -> (Bound<&str>, Bound<&str>) {
    let start = match &range.start {
        Some(start) => Bound::Included(start.as_str()),
        None => Bound::Unbounded,
    };
    let end = match &range.end {
        Some(end) => Bound::Excluded(end.as_str()),
        None => Bound::Unbounded,
    };
    (start, end)
}

impl KvPartition for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Result<Option<VersionedEntry>> {
        self.shared.ensure_open()?;
        self.shared.get_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.tree.read().get(key).cloned())
    }

    fn put(
        &self,
        key: &str,
        value: Bytes,
        version: Option<u64>,
        if_version: Option<u64>,
    ) -> Result<u64> {
        self.shared.ensure_open()?;
        // Writers serialize on the transaction lock; inside a transaction on
        // the same thread this is reentrant and free.
        let _writer = self.shared.txn.lock();
        let mut tree = self.tree.write();

        let current = tree.get(key);
        if let Some(expected) = if_version {
            match current {
                Some(entry) if entry.version == expected => {}
                _ => {
                    return Err(StoreError::VersionConflict {
                        bucket: self.name.clone(),
                        key: key.to_string(),
                    })
                }
            }
        }

        let assigned =
            version.unwrap_or_else(|| current.map(|entry| entry.version + 1).unwrap_or(1));
        tree.insert(key.to_string(), VersionedEntry::new(value, assigned));
        self.shared.put_count.fetch_add(1, Ordering::Relaxed);
        Ok(assigned)
    }

    fn remove(&self, key: &str, if_version: Option<u64>) -> Result<bool> {
        self.shared.ensure_open()?;
        let _writer = self.shared.txn.lock();
        let mut tree = self.tree.write();

        if let Some(expected) = if_version {
            match tree.get(key) {
                Some(entry) if entry.version == expected => {}
                _ => {
                    return Err(StoreError::VersionConflict {
                        bucket: self.name.clone(),
                        key: key.to_string(),
                    })
                }
            }
        }

        self.shared.remove_count.fetch_add(1, Ordering::Relaxed);
        Ok(tree.remove(key).is_some())
    }

    fn get_many(&self, keys: &[String]) -> Result<Vec<Option<VersionedEntry>>> {
        self.shared.ensure_open()?;
        self.shared.get_count.fetch_add(1, Ordering::Relaxed);
        let tree = self.tree.read();
        Ok(keys.iter().map(|key| tree.get(key).cloned()).collect())
    }

    fn get_keys(&self, range: &ScanRange) -> Result<Vec<String>> {
        self.shared.ensure_open()?;
        let tree = self.tree.read();
        Ok(tree
            .range::<str, _>(range_bounds(range))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn get_range(&self, range: &ScanRange) -> Result<Vec<(String, VersionedEntry)>> {
        self.shared.ensure_open()?;
        let tree = self.tree.read();
        Ok(tree
            .range::<str, _>(range_bounds(range))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect())
    }

    fn close(&self) -> Result<()> {
        // Partition handles own no resources beyond the shared tree.
        Ok(())
    }
}
