//! The store: engine ownership, registries, and lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::engine::{KvEngine, KvPartition};
use crate::error::{Result, StoreError};
use crate::events::{ChangeEvent, ChangeNotifier, ObserverId};
use crate::keys::DELIMITER;
use crate::store::bucket::Bucket;
use crate::store::options::BucketOptions;

/// Name of the reserved partition holding TTL markers.
pub const TTL_PARTITION: &str = "ttl";

/// Name of the reserved partition holding index entries.
pub const INDEX_PARTITION: &str = "index";

/// State shared between the store handle and the bucket handles it vends.
pub(crate) struct StoreInner<E: KvEngine> {
    pub(crate) engine: E,
    pub(crate) ttl: Arc<E::Partition>,
    pub(crate) index: Arc<E::Partition>,
    pub(crate) buckets: RwLock<HashMap<String, Arc<E::Partition>>>,
    /// Indexed field names per bucket, fixed at first open.
    pub(crate) indexes: RwLock<HashMap<String, Arc<[String]>>>,
    /// Cooperative re-entrancy guard for `clean`; concurrent sweeps are
    /// dropped, not queued.
    pub(crate) sweeping: AtomicBool,
    pub(crate) notifier: ChangeNotifier,
    pub(crate) closed: AtomicBool,
}

impl<E: KvEngine> StoreInner<E> {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

/// The layered store.
///
/// Wraps an ordered key-value engine and vends [`Bucket`] handles that add
/// optimistic concurrency, passive TTL expiry, secondary-index maintenance,
/// and change notification. Cloning a `Store` clones a handle to the same
/// underlying state.
pub struct Store<E: KvEngine> {
    pub(crate) inner: Arc<StoreInner<E>>,
}

impl<E: KvEngine> Clone for Store<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: KvEngine> std::fmt::Debug for Store<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("buckets", &self.inner.buckets.read().len())
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl<E: KvEngine> Store<E> {
    /// Opens a store over `engine`, opening the reserved `ttl` and `index`
    /// partitions.
    pub fn open(engine: E) -> Result<Self> {
        let ttl = Arc::new(engine.open_partition(TTL_PARTITION)?);
        let index = Arc::new(engine.open_partition(INDEX_PARTITION)?);
        info!("store opened");
        Ok(Self {
            inner: Arc::new(StoreInner {
                engine,
                ttl,
                index,
                buckets: RwLock::new(HashMap::new()),
                indexes: RwLock::new(HashMap::new()),
                sweeping: AtomicBool::new(false),
                notifier: ChangeNotifier::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Opens (or returns the cached handle for) a named bucket.
    ///
    /// Repeated calls with the same name are idempotent and keep the index
    /// declaration from the first open. A later call declaring a *different*
    /// index set is rejected with [`StoreError::IndexRedeclaration`];
    /// declaring nothing (the default options) always matches.
    pub fn bucket(&self, name: &str, options: BucketOptions) -> Result<Bucket<E>> {
        self.inner.ensure_open()?;
        validate_bucket_name(name)?;

        let mut buckets = self.inner.buckets.write();
        let mut indexes = self.inner.indexes.write();

        if let Some(tree) = buckets.get(name) {
            let declared = indexes
                .get(name)
                .cloned()
                .unwrap_or_else(|| Arc::from(Vec::new()));
            if !options.indexes.is_empty() && options.indexes.as_slice() != declared.as_ref() {
                return Err(StoreError::IndexRedeclaration(name.to_string()));
            }
            return Ok(Bucket::new(
                name.to_string(),
                Arc::clone(tree),
                Arc::clone(&self.inner),
                declared,
            ));
        }

        let tree = Arc::new(self.inner.engine.open_partition(name)?);
        let declared: Arc<[String]> = options.indexes.into();
        buckets.insert(name.to_string(), Arc::clone(&tree));
        indexes.insert(name.to_string(), Arc::clone(&declared));
        debug!(bucket = name, indexes = ?declared, "bucket opened");

        Ok(Bucket::new(
            name.to_string(),
            tree,
            Arc::clone(&self.inner),
            declared,
        ))
    }

    /// Registers a change observer; returns the handle to deregister it.
    pub fn on_change(
        &self,
        observer: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.inner.notifier.subscribe(observer)
    }

    /// Deregisters a change observer. Returns whether it was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    /// Closes every bucket partition, the reserved partitions, and the
    /// engine. Idempotent; operations after close fail with
    /// [`StoreError::Closed`].
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        {
            let buckets = self.inner.buckets.read();
            for tree in buckets.values() {
                tree.close()?;
            }
        }
        self.inner.ttl.close()?;
        self.inner.index.close()?;
        self.inner.engine.close()?;
        info!("store closed");
        Ok(())
    }
}

/// Bucket names may not be empty, may not contain the composite-key
/// delimiter, and may not shadow a reserved partition.
pub(crate) fn validate_bucket_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains(DELIMITER)
        || name == TTL_PARTITION
        || name == INDEX_PARTITION
    {
        return Err(StoreError::InvalidBucketName(name.to_string()));
    }
    Ok(())
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
