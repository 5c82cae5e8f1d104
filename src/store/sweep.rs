//! Passive TTL sweep.
//!
//! Nothing here runs on a timer. An external scheduler (or a test) calls
//! `clean`, which scans the TTL partition up to "now" and removes every
//! expired entry and its marker inside one engine transaction. Expired
//! entries are removed quietly: passive expiration emits no change events.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::engine::{KvEngine, KvPartition, ScanRange};
use crate::error::Result;
use crate::keys::{parse_ttl_key, TtlRef};
use crate::store::core::{now_millis, validate_bucket_name, Store};
use crate::store::options::{BucketOptions, RemoveOptions};

/// Clears the sweep-in-progress flag on every exit path, including errors,
/// so a failed sweep never wedges the next one.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<E: KvEngine> Store<E> {
    /// Sweeps every entry whose expiration is at or before the current
    /// wall-clock time. Returns the number of swept entries.
    pub fn clean(&self) -> Result<u64> {
        self.clean_at(now_millis())
    }

    /// Sweeps every entry whose expiration is at or before `now` (epoch
    /// milliseconds).
    ///
    /// If a sweep is already in progress the call returns `Ok(0)`
    /// immediately; concurrent sweeps are dropped, not queued, so callers
    /// needing a guaranteed sweep must retry. All removals (bucket entries,
    /// their index entries, and the TTL markers) commit in one transaction;
    /// a partial sweep is never observable.
    pub fn clean_at(&self, now: u64) -> Result<u64> {
        self.inner.ensure_open()?;
        if self
            .inner
            .sweeping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(0);
        }
        let _guard = SweepGuard(&self.inner.sweeping);

        // Expiration `<= now` means everything lexically below the next
        // millisecond's marker prefix.
        let bound = (now + 1).to_string();
        let mut expired: Vec<(String, TtlRef)> = Vec::new();
        for raw in self.inner.ttl.get_keys(&ScanRange::up_to(bound))? {
            match parse_ttl_key(&raw) {
                Some(marker) if validate_bucket_name(&marker.bucket).is_ok() => {
                    expired.push((raw, marker));
                }
                _ => {
                    // Tolerate format drift in the TTL partition.
                    debug!(key = %raw, "skipping malformed ttl key");
                }
            }
        }

        if expired.is_empty() {
            return Ok(0);
        }

        let swept = self.inner.engine.transaction(|| {
            for (raw, marker) in &expired {
                let bucket = self.bucket(&marker.bucket, BucketOptions::default())?;
                bucket.remove(&marker.key, RemoveOptions::new().quiet())?;
                self.inner.ttl.remove(raw, None)?;
            }
            Ok(expired.len() as u64)
        })?;

        debug!(swept, "ttl sweep complete");
        Ok(swept)
    }
}
