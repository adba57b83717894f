// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! In-process object store for direct-call objects.
//!
//! One mutex guards all store state. Callbacks registered by readers are
//! drained into locals under the lock and invoked only after it is
//! released; they may re-enter the store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use helio_common::config::helio_config;
use helio_common::id::{ObjectID, TaskTransportType};
use helio_proto::rpc::ErrorType;

use crate::error::{CoreWorkerError, CoreWorkerResult};

/// One-shot callback delivering an object value to an async reader.
pub type ObjectCallback = Box<dyn FnOnce(Arc<HelioObject>) + Send>;

/// Callback that forwards an object to the plasma store under its
/// plasma-transport id.
pub type StoreInPlasma = Box<dyn Fn(&HelioObject, ObjectID) + Send + Sync>;

/// Metadata encoding of a synthetic failure object: the decimal string of
/// the error enumeration value. Shared with every language binding.
pub fn error_metadata(error_type: ErrorType) -> Bytes {
    Bytes::from((error_type as i32).to_string())
}

/// An immutable object value: a data payload and a metadata payload, at
/// least one of them non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct HelioObject {
    data: Bytes,
    metadata: Bytes,
}

impl HelioObject {
    pub fn new(data: Bytes, metadata: Bytes) -> Self {
        assert!(
            !data.is_empty() || !metadata.is_empty(),
            "a stored object must carry data or metadata"
        );
        Self { data, metadata }
    }

    /// Create a data-only object.
    pub fn from_data(data: Bytes) -> Self {
        Self::new(data, Bytes::new())
    }

    /// Create a synthetic failure object tagged with an error type.
    pub fn from_error(error_type: ErrorType) -> Self {
        Self {
            data: Bytes::new(),
            metadata: error_metadata(error_type),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn metadata(&self) -> &Bytes {
        &self.metadata
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Whether the metadata tags this object as the given failure type.
    pub fn is_error_type(&self, error_type: ErrorType) -> bool {
        self.metadata == error_metadata(error_type)
    }

    /// Whether this entry is a placeholder for a value that actually lives
    /// in plasma.
    pub fn is_in_plasma_error(&self) -> bool {
        self.is_error_type(ErrorType::ObjectInPlasma)
    }
}

/// Outcome of a blocking [`CoreWorkerMemoryStore::get`].
///
/// `objects` has the same length as the requested id list, filled at the
/// positions whose objects were available. `timed_out` is set when the
/// deadline expired before enough positions were filled; `objects` then
/// holds whatever arrived in time.
#[derive(Debug)]
pub struct GetResult {
    pub objects: Vec<Option<Arc<HelioObject>>>,
    pub timed_out: bool,
}

// ─── GetRequest ─────────────────────────────────────────────────────────────

struct GetState {
    /// Values collected so far, keyed by id.
    objects: HashMap<ObjectID, Arc<HelioObject>>,
    /// Latches true once `num_objects` values arrived; never unset. Values
    /// delivered afterwards are dropped.
    is_ready: bool,
}

/// Coordination record for one blocked `get` call, co-owned by the waiting
/// caller and by the per-id waiter lists until deregistration.
struct GetRequest {
    object_ids: HashSet<ObjectID>,
    num_objects: usize,
    remove_after_get: bool,
    state: Mutex<GetState>,
    cv: Condvar,
}

impl GetRequest {
    fn new(object_ids: HashSet<ObjectID>, num_objects: usize, remove_after_get: bool) -> Self {
        assert!(
            num_objects <= object_ids.len(),
            "get request requires {num_objects} objects but only awaits {}",
            object_ids.len()
        );
        Self {
            object_ids,
            num_objects,
            remove_after_get,
            state: Mutex::new(GetState {
                objects: HashMap::new(),
                is_ready: false,
            }),
            cv: Condvar::new(),
        }
    }

    fn object_ids(&self) -> &HashSet<ObjectID> {
        &self.object_ids
    }

    fn should_remove_objects(&self) -> bool {
        self.remove_after_get
    }

    /// Block until enough objects arrived, or the timeout expires.
    /// `None` waits forever. Returns whether the request completed.
    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut state = self.state.lock();
        match timeout {
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !state.is_ready {
                    if self.cv.wait_until(&mut state, deadline).timed_out() {
                        return state.is_ready;
                    }
                }
                true
            }
            None => {
                let warn_interval =
                    Duration::from_millis(helio_config().get_warn_interval_ms.max(1));
                while !state.is_ready {
                    if self.cv.wait_for(&mut state, warn_interval).timed_out() {
                        tracing::warn!(
                            awaited = self.object_ids.len(),
                            required = self.num_objects,
                            "get is still waiting on the in-memory store"
                        );
                    }
                }
                true
            }
        }
    }

    /// Record an arriving value. Ignored once the request is ready.
    fn set(&self, object_id: ObjectID, object: Arc<HelioObject>) {
        let mut state = self.state.lock();
        if state.is_ready {
            return;
        }
        state.objects.insert(object_id, object);
        if state.objects.len() == self.num_objects {
            state.is_ready = true;
            self.cv.notify_all();
        }
    }

    fn get(&self, object_id: &ObjectID) -> Option<Arc<HelioObject>> {
        self.state.lock().objects.get(object_id).cloned()
    }
}

// ─── Memory store ───────────────────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    /// Direct-call object values. Entries may outlive their map presence
    /// through the `Arc`s handed to readers.
    objects: HashMap<ObjectID, Arc<HelioObject>>,
    /// Blocked `get` calls awaiting each id.
    object_get_requests: HashMap<ObjectID, Vec<Arc<GetRequest>>>,
    /// Async callbacks awaiting each id, in registration order.
    object_async_get_requests: HashMap<ObjectID, Vec<ObjectCallback>>,
    /// Ids whose next `put` must be forwarded to plasma.
    promoted_to_plasma: HashSet<ObjectID>,
}

/// Thread-safe in-process store for direct-call objects.
pub struct CoreWorkerMemoryStore {
    store_in_plasma: Option<StoreInPlasma>,
    state: Mutex<StoreState>,
}

impl CoreWorkerMemoryStore {
    pub fn new() -> Self {
        Self {
            store_in_plasma: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// A store that can promote objects to the plasma store on demand.
    pub fn with_plasma_provider(store_in_plasma: StoreInPlasma) -> Self {
        Self {
            store_in_plasma: Some(store_in_plasma),
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Put an object under a direct-call id.
    ///
    /// Fails with `ObjectExists` if the id is already present, touching
    /// nothing else. Otherwise satisfies every waiter registered for the
    /// id, forwards the value to plasma if a promotion was recorded, and
    /// inserts the entry unless a `remove_after_get` waiter consumed it.
    pub fn put(&self, object_id: ObjectID, object: HelioObject) -> CoreWorkerResult<()> {
        assert!(
            object_id.is_direct_call_type(),
            "{object_id:?} is not a direct-call id"
        );
        let entry = Arc::new(object);

        let async_callbacks = {
            let mut state = self.state.lock();
            if state.objects.contains_key(&object_id) {
                return Err(CoreWorkerError::ObjectExists(object_id.hex()));
            }

            let async_callbacks = state
                .object_async_get_requests
                .remove(&object_id)
                .unwrap_or_default();

            if state.promoted_to_plasma.remove(&object_id) {
                let store_in_plasma = self
                    .store_in_plasma
                    .as_ref()
                    .expect("promotion recorded without a plasma provider");
                store_in_plasma(&entry, object_id.with_transport(TaskTransportType::Nodelet));
            }

            let mut should_add_entry = true;
            if let Some(get_requests) = state.object_get_requests.get(&object_id) {
                for get_request in get_requests {
                    get_request.set(object_id, Arc::clone(&entry));
                    if get_request.should_remove_objects() {
                        should_add_entry = false;
                    }
                }
            }

            if should_add_entry {
                state.objects.insert(object_id, Arc::clone(&entry));
            }
            async_callbacks
        };

        // Outside the lock: the callbacks may re-enter the store.
        for callback in async_callbacks {
            callback(Arc::clone(&entry));
        }

        Ok(())
    }

    /// Deliver the object to `callback` once it is available. The callback
    /// runs immediately, on the calling thread, if the object is already
    /// present; otherwise on whichever thread performs the matching `put`.
    pub fn get_async(&self, object_id: ObjectID, callback: ObjectCallback) {
        let mut state = self.state.lock();
        if let Some(entry) = state.objects.get(&object_id).cloned() {
            drop(state);
            callback(entry);
        } else {
            state
                .object_async_get_requests
                .entry(object_id)
                .or_default()
                .push(callback);
        }
    }

    /// Get a single object if it is locally available. Returns `None` when
    /// the object is absent (recording that its next `put` must be promoted
    /// to plasma) or when it already lives in plasma.
    pub fn get_or_promote_to_plasma(&self, object_id: &ObjectID) -> Option<Arc<HelioObject>> {
        let mut state = self.state.lock();
        if let Some(entry) = state.objects.get(object_id) {
            if entry.is_in_plasma_error() {
                return None;
            }
            return Some(Arc::clone(entry));
        }
        assert!(
            self.store_in_plasma.is_some(),
            "cannot promote an object without a plasma provider"
        );
        state.promoted_to_plasma.insert(*object_id);
        None
    }

    /// Get a list of objects, blocking until `num_objects` positions are
    /// filled or the timeout expires. `object_ids` may contain duplicates;
    /// each occurrence counts separately. `None` waits forever.
    pub fn get(
        &self,
        object_ids: &[ObjectID],
        num_objects: usize,
        timeout: Option<Duration>,
        remove_after_get: bool,
    ) -> GetResult {
        let mut results: Vec<Option<Arc<HelioObject>>> = vec![None; object_ids.len()];
        let mut count = 0usize;

        let get_request = {
            let mut remaining_ids = HashSet::new();
            let mut ids_to_remove = HashSet::new();

            let mut state = self.state.lock();
            for (i, object_id) in object_ids.iter().enumerate() {
                if count >= num_objects {
                    break;
                }
                if let Some(entry) = state.objects.get(object_id) {
                    results[i] = Some(Arc::clone(entry));
                    if remove_after_get {
                        // Deferred: a later duplicate occurrence must still
                        // find the entry.
                        ids_to_remove.insert(*object_id);
                    }
                    count += 1;
                } else {
                    remaining_ids.insert(*object_id);
                }
            }
            for object_id in &ids_to_remove {
                state.objects.remove(object_id);
            }

            if remaining_ids.is_empty() || count >= num_objects {
                return GetResult {
                    objects: results,
                    timed_out: false,
                };
            }

            let required_objects = num_objects - (object_ids.len() - remaining_ids.len());
            let get_request = Arc::new(GetRequest::new(
                remaining_ids,
                required_objects,
                remove_after_get,
            ));
            for object_id in get_request.object_ids() {
                state
                    .object_get_requests
                    .entry(*object_id)
                    .or_default()
                    .push(Arc::clone(&get_request));
            }
            get_request
        };

        let done = get_request.wait(timeout);

        {
            let mut state = self.state.lock();
            for (i, object_id) in object_ids.iter().enumerate() {
                if results[i].is_none() {
                    results[i] = get_request.get(object_id);
                }
            }

            for object_id in get_request.object_ids() {
                if let Some(get_requests) = state.object_get_requests.get_mut(object_id) {
                    get_requests.retain(|request| !Arc::ptr_eq(request, &get_request));
                    if get_requests.is_empty() {
                        state.object_get_requests.remove(object_id);
                    }
                }
            }
        }

        GetResult {
            objects: results,
            timed_out: !done,
        }
    }

    /// Delete objects from the store. Missing ids are not an error.
    pub fn delete(&self, object_ids: &[ObjectID]) {
        let mut state = self.state.lock();
        for object_id in object_ids {
            state.objects.remove(object_id);
        }
    }

    /// Whether the store holds the object's value. Plasma placeholders
    /// answer false; the plasma store is authoritative for those.
    pub fn contains(&self, object_id: &ObjectID) -> bool {
        let state = self.state.lock();
        state
            .objects
            .get(object_id)
            .map_or(false, |entry| !entry.is_in_plasma_error())
    }

    /// Number of entries currently stored.
    pub fn size(&self) -> usize {
        self.state.lock().objects.len()
    }
}

impl Default for CoreWorkerMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use helio_common::id::TaskID;

    fn direct_id() -> ObjectID {
        ObjectID::for_task_return(&TaskID::from_random(), 1)
    }

    fn make_object(data: &[u8]) -> HelioObject {
        HelioObject::from_data(Bytes::copy_from_slice(data))
    }

    #[test]
    fn test_put_and_get_immediate() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        store.put(oid, make_object(b"hello")).unwrap();

        let result = store.get(&[oid], 1, None, false);
        assert!(!result.timed_out);
        assert_eq!(result.objects[0].as_ref().unwrap().data().as_ref(), b"hello");
        // Plain get does not consume the entry.
        assert!(store.contains(&oid));
    }

    #[test]
    fn test_duplicate_put_fails() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        store.put(oid, make_object(b"a")).unwrap();
        let err = store.put(oid, make_object(b"b")).unwrap_err();
        assert!(matches!(err, CoreWorkerError::ObjectExists(_)));
        // The original value is untouched.
        let result = store.get(&[oid], 1, None, false);
        assert_eq!(result.objects[0].as_ref().unwrap().data().as_ref(), b"a");
    }

    #[test]
    #[should_panic(expected = "not a direct-call id")]
    fn test_put_rejects_plasma_transport_id() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id().with_transport(TaskTransportType::Nodelet);
        let _ = store.put(oid, make_object(b"x"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        store.put(oid, make_object(b"x")).unwrap();
        store.delete(&[oid, oid]);
        assert!(!store.contains(&oid));
        store.delete(&[oid]);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_contains_excludes_plasma_placeholders() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        assert!(!store.contains(&oid));
        store
            .put(oid, HelioObject::from_error(ErrorType::ObjectInPlasma))
            .unwrap();
        assert!(!store.contains(&oid));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_get_async_immediate() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        store.put(oid, make_object(b"now")).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = Arc::clone(&fired);
        store.get_async(
            oid,
            Box::new(move |obj| {
                assert_eq!(obj.data().as_ref(), b"now");
                fired2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_async_fires_in_registration_order() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();

        let order = Arc::new(Mutex::new(Vec::new()));
        for marker in 1u8..=3 {
            let order = Arc::clone(&order);
            store.get_async(oid, Box::new(move |_| order.lock().push(marker)));
        }
        assert!(order.lock().is_empty());

        store.put(oid, make_object(b"v")).unwrap();
        assert_eq!(*order.lock(), vec![1, 2, 3]);

        // The waiters were one-shot; a fresh waiter sees the stored value.
        let order2 = Arc::clone(&order);
        store.get_async(oid, Box::new(move |_| order2.lock().push(9)));
        assert_eq!(*order.lock(), vec![1, 2, 3, 9]);
    }

    #[test]
    fn test_get_partial_without_blocking() {
        let store = CoreWorkerMemoryStore::new();
        let present = direct_id();
        let missing = direct_id();
        store.put(present, make_object(b"p")).unwrap();

        let result = store.get(&[present, missing], 1, None, false);
        assert!(!result.timed_out);
        assert!(result.objects[0].is_some());
        assert!(result.objects[1].is_none());
    }

    #[test]
    fn test_get_timeout_returns_partial_and_deregisters() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();

        let start = Instant::now();
        let result = store.get(&[oid], 1, Some(Duration::from_millis(50)), false);
        assert!(result.timed_out);
        assert!(result.objects[0].is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));

        // The timed-out request deregistered itself; a put must succeed and
        // keep the entry.
        store.put(oid, make_object(b"late")).unwrap();
        assert!(store.contains(&oid));
    }

    #[test]
    fn test_get_blocks_until_put() {
        let store = Arc::new(CoreWorkerMemoryStore::new());
        let oid = direct_id();

        let store2 = Arc::clone(&store);
        let putter = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            store2.put(oid, make_object(b"arrived")).unwrap();
        });

        let result = store.get(&[oid], 1, Some(Duration::from_secs(5)), false);
        putter.join().unwrap();
        assert!(!result.timed_out);
        assert_eq!(result.objects[0].as_ref().unwrap().data().as_ref(), b"arrived");
    }

    #[test]
    fn test_remove_after_get_consumes_entry() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        store.put(oid, make_object(b"once")).unwrap();

        let result = store.get(&[oid], 1, None, true);
        assert!(result.objects[0].is_some());
        assert!(!store.contains(&oid));
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_remove_after_get_with_duplicate_ids() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        store.put(oid, make_object(b"dup")).unwrap();

        // Removal is deferred past the scan, so both positions fill from
        // the captured entry.
        let result = store.get(&[oid, oid], 2, None, true);
        assert!(!result.timed_out);
        assert!(result.objects[0].is_some());
        assert!(result.objects[1].is_some());
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_waiter_with_remove_consumes_put() {
        let store = Arc::new(CoreWorkerMemoryStore::new());
        let oid = direct_id();

        let store2 = Arc::clone(&store);
        let getter = thread::spawn(move || store2.get(&[oid], 1, Some(Duration::from_secs(5)), true));

        // Wait for the getter to register, then put.
        thread::sleep(Duration::from_millis(20));
        store.put(oid, make_object(b"taken")).unwrap();

        let result = getter.join().unwrap();
        assert!(!result.timed_out);
        assert_eq!(result.objects[0].as_ref().unwrap().data().as_ref(), b"taken");
        // The waiter consumed the value; the entry was never added.
        assert_eq!(store.size(), 0);
        store.put(oid, make_object(b"again")).unwrap();
    }

    #[test]
    fn test_put_in_plasma_error_satisfies_waiters() {
        let store = Arc::new(CoreWorkerMemoryStore::new());
        let oid = direct_id();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        store.get_async(
            oid,
            Box::new(move |obj| {
                assert!(obj.is_in_plasma_error());
                seen2.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let store2 = Arc::clone(&store);
        let getter = thread::spawn(move || store2.get(&[oid], 1, Some(Duration::from_secs(5)), false));

        thread::sleep(Duration::from_millis(20));
        store
            .put(oid, HelioObject::from_error(ErrorType::ObjectInPlasma))
            .unwrap();

        let result = getter.join().unwrap();
        assert!(!result.timed_out);
        assert!(result.objects[0].as_ref().unwrap().is_in_plasma_error());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_promotion_forwards_next_put_to_plasma() {
        let promoted: Arc<Mutex<Vec<(Vec<u8>, ObjectID)>>> = Arc::new(Mutex::new(Vec::new()));
        let promoted2 = Arc::clone(&promoted);
        let store = CoreWorkerMemoryStore::with_plasma_provider(Box::new(move |obj, id| {
            promoted2.lock().push((obj.data().to_vec(), id));
        }));

        let oid = direct_id();
        assert!(store.get_or_promote_to_plasma(&oid).is_none());

        store.put(oid, make_object(b"big")).unwrap();

        let calls = promoted.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, b"big");
        assert_eq!(calls[0].1, oid.with_transport(TaskTransportType::Nodelet));
        drop(calls);

        // The entry is still inserted locally and the promotion was
        // consumed: deleting and re-putting does not forward again.
        assert!(store.contains(&oid));
        store.delete(&[oid]);
        store.put(oid, make_object(b"small")).unwrap();
        assert_eq!(promoted.lock().len(), 1);
    }

    #[test]
    fn test_get_or_promote_returns_present_value() {
        let store = CoreWorkerMemoryStore::with_plasma_provider(Box::new(|_, _| {}));
        let oid = direct_id();
        store.put(oid, make_object(b"v")).unwrap();
        let obj = store.get_or_promote_to_plasma(&oid).unwrap();
        assert_eq!(obj.data().as_ref(), b"v");
    }

    #[test]
    fn test_get_or_promote_defers_plasma_resident_values() {
        let store = CoreWorkerMemoryStore::with_plasma_provider(Box::new(|_, _| {}));
        let oid = direct_id();
        store
            .put(oid, HelioObject::from_error(ErrorType::ObjectInPlasma))
            .unwrap();
        assert!(store.get_or_promote_to_plasma(&oid).is_none());
    }

    #[test]
    #[should_panic(expected = "without a plasma provider")]
    fn test_get_or_promote_without_provider_panics() {
        let store = CoreWorkerMemoryStore::new();
        let oid = direct_id();
        let _ = store.get_or_promote_to_plasma(&oid);
    }

    #[test]
    fn test_error_object_metadata_encoding() {
        let obj = HelioObject::from_error(ErrorType::WorkerDied);
        assert!(obj.is_error_type(ErrorType::WorkerDied));
        assert!(!obj.is_error_type(ErrorType::ActorDied));
        assert_eq!(obj.metadata().as_ref(), b"0");
        assert_eq!(
            HelioObject::from_error(ErrorType::ObjectInPlasma)
                .metadata()
                .as_ref(),
            b"4"
        );
    }

    #[test]
    fn test_get_num_objects_subset() {
        let store = Arc::new(CoreWorkerMemoryStore::new());
        let a = direct_id();
        let b = direct_id();

        let store2 = Arc::clone(&store);
        let getter =
            thread::spawn(move || store2.get(&[a, b], 1, Some(Duration::from_secs(5)), false));

        thread::sleep(Duration::from_millis(20));
        store.put(b, make_object(b"second")).unwrap();

        // One of two satisfies the request.
        let result = getter.join().unwrap();
        assert!(!result.timed_out);
        assert!(result.objects[0].is_none());
        assert_eq!(result.objects[1].as_ref().unwrap().data().as_ref(), b"second");
    }
}
