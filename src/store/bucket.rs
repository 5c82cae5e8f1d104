//! The bucket wrapper: versioned writes, TTL scheduling, index maintenance,
//! and change events around a raw engine partition.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::engine::{KvEngine, KvPartition, ScanRange, VersionedEntry};
use crate::error::{Result, StoreError};
use crate::events::{ChangeEvent, ChangeOp};
use crate::keys;
use crate::store::core::{now_millis, StoreInner};
use crate::store::options::{PutOptions, RemoveOptions};

/// A wrapped bucket.
///
/// Obtained from `Store::bucket`. The wrapper delegates storage to its
/// engine partition and intercepts mutations to maintain TTL markers and
/// index entries inside the same transaction as the write. Handles are cheap
/// to clone and share the store's state.
pub struct Bucket<E: KvEngine> {
    name: String,
    tree: Arc<E::Partition>,
    store: Arc<StoreInner<E>>,
    indexes: Arc<[String]>,
}

impl<E: KvEngine> Clone for Bucket<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tree: Arc::clone(&self.tree),
            store: Arc::clone(&self.store),
            indexes: Arc::clone(&self.indexes),
        }
    }
}

impl<E: KvEngine> std::fmt::Debug for Bucket<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("indexes", &self.indexes)
            .finish()
    }
}

impl<E: KvEngine> Bucket<E> {
    pub(crate) fn new(
        name: String,
        tree: Arc<E::Partition>,
        store: Arc<StoreInner<E>>,
        indexes: Arc<[String]>,
    ) -> Self {
        Self {
            name,
            tree,
            store,
            indexes,
        }
    }

    /// The bucket's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The indexed field names declared at first open.
    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    /// Writes `value` under `id`.
    ///
    /// The versioned write, the TTL marker (when `options.ttl` is set), and
    /// index reconciliation happen inside one engine transaction; a version
    /// conflict aborts it with no side effects. When an indexed field's
    /// value changes, the index entry for the prior value is removed and one
    /// for the new value inserted, so stale index entries never accumulate.
    ///
    /// Unless `options.quiet`, a [`ChangeOp::Put`] event carrying the
    /// encoded value and the assigned version is emitted after the
    /// transaction commits.
    pub fn put<V: Serialize>(&self, id: &str, value: &V, options: PutOptions) -> Result<()> {
        let encoded = encode(value)?;
        let doc = if self.indexes.is_empty() {
            None
        } else {
            Some(to_doc(value)?)
        };

        let assigned = self.store.engine.transaction(|| {
            let prior = if self.indexes.is_empty() {
                None
            } else {
                self.tree.get(id)?
            };

            let assigned = self
                .tree
                .put(id, encoded.clone(), options.version, options.if_version)?;

            if let Some(ttl) = options.ttl {
                let expiration = now_millis() + ttl.as_millis() as u64;
                let marker = keys::ttl_key(expiration, &self.name, id);
                self.store.ttl.put(&marker, Bytes::new(), None, None)?;
            }

            if let Some(doc) = &doc {
                let prior_doc = prior
                    .as_ref()
                    .map(|entry| decode_doc(&entry.value))
                    .transpose()?;
                self.reconcile_indexes(id, prior_doc.as_ref(), Some(doc))?;
            }
            Ok(assigned)
        })?;

        if !options.quiet {
            self.store.notifier.emit(&ChangeEvent {
                op: ChangeOp::Put,
                bucket: self.name.clone(),
                id: id.to_string(),
                value: Some(encoded),
                version: Some(assigned),
                ttl: options.ttl,
            });
        }
        Ok(())
    }

    /// Deletes the entry at `id`. Returns whether it existed.
    ///
    /// Index entries computed from the current value are removed inside the
    /// same transaction as the delete; an `if_version` mismatch aborts with
    /// no side effects. Unless `options.quiet`, a [`ChangeOp::Remove`] event
    /// carrying the encoded pre-deletion value is emitted for an entry that
    /// actually existed.
    pub fn remove(&self, id: &str, options: RemoveOptions) -> Result<bool> {
        let mut removed: Option<VersionedEntry> = None;

        let existed = self.store.engine.transaction(|| {
            let Some(current) = self.tree.get(id)? else {
                // Delegate so an `if_version` on an absent entry conflicts
                // with the same error the engine reports.
                return self.tree.remove(id, options.if_version);
            };

            if let Some(expected) = options.if_version {
                if current.version != expected {
                    return Err(StoreError::VersionConflict {
                        bucket: self.name.clone(),
                        key: id.to_string(),
                    });
                }
            }

            if !self.indexes.is_empty() {
                let doc = decode_doc(&current.value)?;
                self.reconcile_indexes(id, Some(&doc), None)?;
            }

            let existed = self.tree.remove(id, options.if_version)?;
            removed = Some(current);
            Ok(existed)
        })?;

        if existed && !options.quiet {
            let entry = removed.take();
            self.store.notifier.emit(&ChangeEvent {
                op: ChangeOp::Remove,
                bucket: self.name.clone(),
                id: id.to_string(),
                value: entry.as_ref().map(|entry| entry.value.clone()),
                version: entry.as_ref().map(|entry| entry.version),
                ttl: None,
            });
        }
        Ok(existed)
    }

    /// Reads and decodes the entry at `id`.
    pub fn get<V: DeserializeOwned>(&self, id: &str) -> Result<Option<V>> {
        match self.tree.get(id)? {
            Some(entry) => Ok(Some(decode(&entry.value)?)),
            None => Ok(None),
        }
    }

    /// Bulk read; the result is positionally aligned with `ids`.
    pub fn get_many<V: DeserializeOwned>(&self, ids: &[String]) -> Result<Vec<Option<V>>> {
        self.tree
            .get_many(ids)?
            .into_iter()
            .map(|hit| hit.map(|entry| decode(&entry.value)).transpose())
            .collect()
    }

    /// The stored version of the entry at `id`.
    pub fn version_of(&self, id: &str) -> Result<Option<u64>> {
        Ok(self.tree.get(id)?.map(|entry| entry.version))
    }

    /// Returns all live entries whose indexed field equals `value`.
    ///
    /// Runs a prefix scan over the index partition, then a bulk lookup on
    /// the bucket. Index entries referencing keys that no longer resolve
    /// (removed concurrently or out of band) are filtered out silently; that
    /// filtering is part of the contract, not an optimization.
    pub fn query<Q, V>(&self, index_name: &str, value: &Q) -> Result<Vec<V>>
    where
        Q: Serialize + ?Sized,
        V: DeserializeOwned,
    {
        if !self.indexes.iter().any(|field| field == index_name) {
            return Err(StoreError::UnknownIndex {
                bucket: self.name.clone(),
                index: index_name.to_string(),
            });
        }

        let value = serde_json::to_value(value).map_err(StoreError::serialization)?;
        let repr = keys::index_field_repr(&value).ok_or_else(|| {
            StoreError::Serialization("index lookup values must be scalar".to_string())
        })?;

        let prefix = keys::index_prefix(&self.name, index_name, &repr);
        let refs = self.store.index.get_range(&ScanRange::prefix(&prefix))?;
        let ids: Vec<String> = refs
            .iter()
            .map(|(_, entry)| String::from_utf8_lossy(&entry.value).into_owned())
            .collect();

        let hits = self.tree.get_many(&ids)?;
        hits.into_iter()
            .flatten()
            .map(|entry| decode(&entry.value))
            .collect()
    }

    /// Removes index entries for `old` and inserts entries for `new`,
    /// field by field, skipping fields whose indexable value is unchanged.
    pub(crate) fn reconcile_indexes(
        &self,
        id: &str,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> Result<()> {
        for field in self.indexes.iter() {
            let old_repr = old.and_then(|doc| doc.get(field)).and_then(keys::index_field_repr);
            let new_repr = new.and_then(|doc| doc.get(field)).and_then(keys::index_field_repr);
            if old_repr == new_repr {
                continue;
            }
            if let Some(repr) = old_repr {
                let stale = keys::index_key(&self.name, field, &repr, id);
                self.store.index.remove(&stale, None)?;
            }
            if let Some(repr) = new_repr {
                let fresh = keys::index_key(&self.name, field, &repr, id);
                self.store
                    .index
                    .put(&fresh, Bytes::copy_from_slice(id.as_bytes()), None, None)?;
            }
        }
        Ok(())
    }
}

fn encode<V: Serialize>(value: &V) -> Result<Bytes> {
    Ok(Bytes::from(
        serde_json::to_vec(value).map_err(StoreError::serialization)?,
    ))
}

fn decode<V: DeserializeOwned>(raw: &[u8]) -> Result<V> {
    serde_json::from_slice(raw).map_err(StoreError::serialization)
}

fn to_doc<V: Serialize>(value: &V) -> Result<Value> {
    serde_json::to_value(value).map_err(StoreError::serialization)
}

fn decode_doc(raw: &[u8]) -> Result<Value> {
    serde_json::from_slice(raw).map_err(StoreError::serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{KvEngine, MemoryEngine};
    use crate::store::core::Store;
    use crate::store::options::BucketOptions;
    use serde::Deserialize;
    use std::sync::{Arc as StdArc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        email: String,
        #[serde(default)]
        age: Option<u32>,
    }

    fn user(email: &str) -> User {
        User {
            email: email.to_string(),
            age: None,
        }
    }

    fn store() -> Store<MemoryEngine> {
        Store::open(MemoryEngine::new()).unwrap()
    }

    fn indexed_users(store: &Store<MemoryEngine>) -> Bucket<MemoryEngine> {
        store
            .bucket("users", BucketOptions::new().index("email"))
            .unwrap()
    }

    #[test]
    fn test_put_get_round_trip() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        users.put("user:1", &user("a@x"), PutOptions::new()).unwrap();
        let loaded: User = users.get("user:1").unwrap().unwrap();
        assert_eq!(loaded, user("a@x"));

        assert_eq!(users.get::<User>("user:2").unwrap(), None);
    }

    #[test]
    fn test_versions_auto_increment_and_are_observable() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        users.put("k", &user("a@x"), PutOptions::new()).unwrap();
        assert_eq!(users.version_of("k").unwrap(), Some(1));
        users.put("k", &user("b@x"), PutOptions::new()).unwrap();
        assert_eq!(users.version_of("k").unwrap(), Some(2));

        users
            .put("k", &user("c@x"), PutOptions::new().version(10))
            .unwrap();
        assert_eq!(users.version_of("k").unwrap(), Some(10));

        assert_eq!(users.version_of("missing").unwrap(), None);
    }

    #[test]
    fn test_conditional_put_succeeds_on_matching_version() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        users.put("k", &user("a@x"), PutOptions::new()).unwrap();
        users
            .put("k", &user("b@x"), PutOptions::new().if_version(1))
            .unwrap();
        let loaded: User = users.get("k").unwrap().unwrap();
        assert_eq!(loaded.email, "b@x");
    }

    #[test]
    fn test_version_conflict_has_no_side_effects() {
        let store = store();
        let users = indexed_users(&store);

        users.put("k", &user("old@x"), PutOptions::new()).unwrap();

        // Conflicting conditional overwrite with a new indexed value and a
        // TTL: nothing may change.
        let err = users
            .put(
                "k",
                &user("new@x"),
                PutOptions::new()
                    .if_version(99)
                    .ttl(Duration::from_millis(10)),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let loaded: User = users.get("k").unwrap().unwrap();
        assert_eq!(loaded.email, "old@x");
        assert_eq!(users.version_of("k").unwrap(), Some(1));

        // The old index entry is intact, no entry for the new value, and no
        // TTL marker was scheduled.
        let hits: Vec<User> = users.query("email", "old@x").unwrap();
        assert_eq!(hits.len(), 1);
        let hits: Vec<User> = users.query("email", "new@x").unwrap();
        assert!(hits.is_empty());
        let ttl = store.engine().open_partition("ttl").unwrap();
        assert!(ttl.get_keys(&ScanRange::all()).unwrap().is_empty());

        // Conditional remove conflicts are equally side-effect free.
        let err = users
            .remove("k", RemoveOptions::new().if_version(99))
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
        assert!(users.get::<User>("k").unwrap().is_some());
        let hits: Vec<User> = users.query("email", "old@x").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_query_by_indexed_field() {
        let store = store();
        let users = indexed_users(&store);

        users
            .put("user:1", &user("x@y.com"), PutOptions::new())
            .unwrap();
        users
            .put("user:2", &user("x@y.com"), PutOptions::new())
            .unwrap();
        users
            .put("user:3", &user("other@y.com"), PutOptions::new())
            .unwrap();

        let hits: Vec<User> = users.query("email", "x@y.com").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.email == "x@y.com"));

        users.remove("user:1", RemoveOptions::new()).unwrap();
        let hits: Vec<User> = users.query("email", "x@y.com").unwrap();
        assert_eq!(hits.len(), 1);

        users.remove("user:2", RemoveOptions::new()).unwrap();
        let hits: Vec<User> = users.query("email", "x@y.com").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_overwrite_reconciles_index_entries() {
        let store = store();
        let users = indexed_users(&store);

        users.put("k", &user("old@x"), PutOptions::new()).unwrap();
        users.put("k", &user("new@x"), PutOptions::new()).unwrap();

        let hits: Vec<User> = users.query("email", "old@x").unwrap();
        assert!(hits.is_empty(), "stale index entry survived the overwrite");
        let hits: Vec<User> = users.query("email", "new@x").unwrap();
        assert_eq!(hits.len(), 1);

        // Exactly one index entry remains for the key.
        let index = store.engine().open_partition("index").unwrap();
        let entries = index.get_keys(&ScanRange::prefix("users:email:")).unwrap();
        assert_eq!(entries, vec!["users:email:new@x:k".to_string()]);
    }

    #[test]
    fn test_unchanged_indexed_field_is_left_alone() {
        let store = store();
        let users = indexed_users(&store);

        let mut record = user("same@x");
        users.put("k", &record, PutOptions::new()).unwrap();
        record.age = Some(40);
        users.put("k", &record, PutOptions::new()).unwrap();

        let hits: Vec<User> = users.query("email", "same@x").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].age, Some(40));
    }

    #[test]
    fn test_missing_and_null_fields_are_not_indexed() {
        let store = store();
        let users = store
            .bucket("users", BucketOptions::new().index("age"))
            .unwrap();

        users.put("k", &user("a@x"), PutOptions::new()).unwrap();

        let index = store.engine().open_partition("index").unwrap();
        assert!(index.get_keys(&ScanRange::all()).unwrap().is_empty());

        // Setting the field later creates the entry; nulling it out again
        // removes it.
        let mut record = user("a@x");
        record.age = Some(30);
        users.put("k", &record, PutOptions::new()).unwrap();
        let hits: Vec<User> = users.query("age", &30).unwrap();
        assert_eq!(hits.len(), 1);

        users.put("k", &user("a@x"), PutOptions::new()).unwrap();
        let hits: Vec<User> = users.query("age", &30).unwrap();
        assert!(hits.is_empty());
        assert!(index.get_keys(&ScanRange::all()).unwrap().is_empty());
    }

    #[test]
    fn test_query_filters_stale_index_entries() {
        let store = store();
        let users = indexed_users(&store);

        users.put("k", &user("a@x"), PutOptions::new()).unwrap();

        // Simulate an out-of-band deletion that bypassed index cleanup.
        let raw = store.engine().open_partition("users").unwrap();
        raw.remove("k", None).unwrap();

        let hits: Vec<User> = users.query("email", "a@x").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_query_unknown_index_is_an_error() {
        let store = store();
        let users = indexed_users(&store);

        let err = users.query::<str, User>("name", "ada").unwrap_err();
        assert!(matches!(err, StoreError::UnknownIndex { .. }));
    }

    #[test]
    fn test_change_events_fire_per_mutation() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        let seen = StdArc::new(Mutex::new(Vec::new()));
        let sink = StdArc::clone(&seen);
        store.on_change(move |event| {
            sink.lock()
                .unwrap()
                .push((event.op, event.id.clone(), event.version));
        });

        users.put("k", &user("a@x"), PutOptions::new()).unwrap();
        users.remove("k", RemoveOptions::new()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (ChangeOp::Put, "k".to_string(), Some(1)));
        assert_eq!(seen[1], (ChangeOp::Remove, "k".to_string(), Some(1)));
    }

    #[test]
    fn test_quiet_mutations_emit_nothing() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        let count = StdArc::new(Mutex::new(0u32));
        let sink = StdArc::clone(&count);
        store.on_change(move |_| *sink.lock().unwrap() += 1);

        users
            .put("k", &user("a@x"), PutOptions::new().quiet())
            .unwrap();
        users.remove("k", RemoveOptions::new().quiet()).unwrap();

        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_put_event_carries_encoded_value_and_ttl() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        let seen = StdArc::new(Mutex::new(Vec::new()));
        let sink = StdArc::clone(&seen);
        store.on_change(move |event| sink.lock().unwrap().push(event.clone()));

        users
            .put(
                "k",
                &user("a@x"),
                PutOptions::new().ttl(Duration::from_secs(5)),
            )
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let event = &seen[0];
        assert_eq!(event.bucket, "users");
        assert_eq!(event.ttl, Some(Duration::from_secs(5)));
        let decoded: User = serde_json::from_slice(event.value.as_ref().unwrap()).unwrap();
        assert_eq!(decoded.email, "a@x");
    }

    #[test]
    fn test_remove_event_carries_the_pre_deletion_value() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        let seen = StdArc::new(Mutex::new(Vec::new()));
        let sink = StdArc::clone(&seen);
        store.on_change(move |event| sink.lock().unwrap().push(event.clone()));

        users.put("k", &user("a@x"), PutOptions::new().quiet()).unwrap();
        users.remove("k", RemoveOptions::new()).unwrap();

        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            let decoded: User = serde_json::from_slice(seen[0].value.as_ref().unwrap()).unwrap();
            assert_eq!(decoded.email, "a@x");
        }

        // Removing an absent key reports absence and emits nothing further.
        assert!(!users.remove("k", RemoveOptions::new()).unwrap());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_get_many_aligns_with_ids() {
        let store = store();
        let users = store.bucket("users", BucketOptions::new()).unwrap();

        users.put("a", &user("a@x"), PutOptions::new()).unwrap();
        users.put("c", &user("c@x"), PutOptions::new()).unwrap();

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let hits: Vec<Option<User>> = users.get_many(&ids).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].as_ref().unwrap().email, "a@x");
        assert!(hits[1].is_none());
        assert_eq!(hits[2].as_ref().unwrap().email, "c@x");
    }
}
