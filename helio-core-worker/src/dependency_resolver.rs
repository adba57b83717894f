// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Dependency resolution for task arguments.
//!
//! Before a task is queued for dispatch, every argument referencing a
//! direct-call object is rewritten in place: either the value's bytes are
//! inlined, or (for plasma-resident values) the reference is rewritten to
//! the plasma-transport id so the executor fetches it through the nodelet.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use helio_common::id::{ObjectID, TaskTransportType};
use helio_proto::rpc;

use crate::memory_store::{CoreWorkerMemoryStore, HelioObject};

/// Resolution state for one task, shared by the per-dependency callbacks
/// and released when the last of them fires.
struct TaskState {
    task: rpc::TaskSpec,
    local_dependencies: HashSet<ObjectID>,
    on_complete: Option<Box<dyn FnOnce(rpc::TaskSpec) + Send>>,
}

/// Resolves a task's direct-call dependencies against the local in-memory
/// store.
pub struct LocalDependencyResolver {
    in_memory_store: Arc<CoreWorkerMemoryStore>,
    /// Tasks whose resolution is still in flight. Shared with the
    /// completion callbacks, which outlive any borrow of `self`.
    num_pending: Arc<AtomicUsize>,
}

impl LocalDependencyResolver {
    pub fn new(in_memory_store: Arc<CoreWorkerMemoryStore>) -> Self {
        Self {
            in_memory_store,
            num_pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of tasks currently waiting on dependencies.
    pub fn num_pending_tasks(&self) -> usize {
        self.num_pending.load(Ordering::SeqCst)
    }

    /// Resolve the task's direct-call dependencies, then hand the (possibly
    /// rewritten) task to `on_complete`.
    ///
    /// If nothing needs resolving, `on_complete` runs immediately on the
    /// calling thread. Otherwise it runs exactly once, on the thread that
    /// delivers the final dependency.
    pub fn resolve_dependencies(
        &self,
        task: rpc::TaskSpec,
        on_complete: impl FnOnce(rpc::TaskSpec) + Send + 'static,
    ) {
        let mut local_dependencies = HashSet::new();
        for arg in &task.args {
            if arg.object_ids.is_empty() {
                continue;
            }
            assert!(
                arg.object_ids.len() <= 1,
                "multi-id arguments are not supported"
            );
            let id = ObjectID::from_binary(&arg.object_ids[0]);
            if id.is_direct_call_type() {
                local_dependencies.insert(id);
            }
        }
        if local_dependencies.is_empty() {
            on_complete(task);
            return;
        }

        let object_ids: Vec<ObjectID> = local_dependencies.iter().copied().collect();
        let state = Arc::new(Mutex::new(TaskState {
            task,
            local_dependencies,
            on_complete: Some(Box::new(on_complete)),
        }));
        self.num_pending.fetch_add(1, Ordering::SeqCst);

        for object_id in object_ids {
            let state = Arc::clone(&state);
            let num_pending = Arc::clone(&self.num_pending);
            self.in_memory_store.get_async(
                object_id,
                Box::new(move |value| {
                    let finished = {
                        let mut state = state.lock();
                        state.local_dependencies.remove(&object_id);
                        inline_object_value(&object_id, &value, &mut state.task);
                        if state.local_dependencies.is_empty() {
                            num_pending.fetch_sub(1, Ordering::SeqCst);
                            let task = std::mem::take(&mut state.task);
                            let on_complete = state
                                .on_complete
                                .take()
                                .expect("task resolution completed twice");
                            Some((task, on_complete))
                        } else {
                            None
                        }
                    };
                    // Outside the state lock: the completion may re-enter
                    // the resolver or the store.
                    if let Some((task, on_complete)) = finished {
                        on_complete(task);
                    }
                }),
            );
        }
    }
}

/// Rewrite the argument slot referencing `object_id` with the resolved
/// value. Plasma-resident values are re-pointed at their plasma-transport
/// id; anything else is inlined as bytes.
fn inline_object_value(object_id: &ObjectID, value: &HelioObject, task: &mut rpc::TaskSpec) {
    let mut found = false;
    for arg in &mut task.args {
        let is_target = arg
            .object_ids
            .first()
            .map_or(false, |raw| ObjectID::from_binary(raw) == *object_id);
        if !is_target {
            continue;
        }
        arg.object_ids.clear();
        if value.is_in_plasma_error() {
            arg.object_ids
                .push(object_id.with_transport(TaskTransportType::Nodelet).binary());
        } else {
            if value.has_data() {
                arg.data = value.data().to_vec();
            }
            if value.has_metadata() {
                arg.metadata = value.metadata().to_vec();
            }
        }
        found = true;
    }
    assert!(found, "resolved object {object_id} not referenced by any argument");
}
