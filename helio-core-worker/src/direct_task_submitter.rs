// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Direct task submission with nodelet lease integration.
//!
//! Submitted tasks first have their direct-call dependencies resolved and
//! inlined, then wait in a FIFO queue for a leased worker. The submitter
//! keeps at most one worker-lease request outstanding; each granted or
//! newly idle worker takes the queue head. A failed push fails the task's
//! return objects instead of retrying; higher-level reconstruction owns
//! retry.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use helio_common::id::{ObjectID, TaskID};
use helio_common::runtime::HelioRuntime;
use helio_nodelet_rpc_client::NodeletClient;
use helio_proto::rpc;
use helio_worker_rpc_client::CoreWorkerClient;

use crate::dependency_resolver::LocalDependencyResolver;
use crate::error::CoreWorkerResult;
use crate::memory_store::{CoreWorkerMemoryStore, HelioObject};

/// The RPC endpoint of a leased worker, used as the client-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerAddress {
    pub ip_address: String,
    pub port: i32,
}

impl From<rpc::Address> for WorkerAddress {
    fn from(addr: rpc::Address) -> Self {
        Self {
            ip_address: addr.ip_address,
            port: addr.port,
        }
    }
}

/// Builds an RPC client for a worker address.
pub type ClientFactory = Box<dyn Fn(&WorkerAddress) -> Arc<dyn CoreWorkerClient> + Send + Sync>;

struct SubmitterState {
    /// Tasks whose dependencies are resolved, in dispatch order.
    queued_tasks: VecDeque<rpc::TaskSpec>,
    /// One client per worker address, shared across pushes.
    client_cache: HashMap<WorkerAddress, Arc<dyn CoreWorkerClient>>,
    /// At most one lease request is in flight at a time.
    worker_request_pending: bool,
}

/// Submitter for direct (non-actor) tasks.
pub struct DirectTaskSubmitter {
    runtime: HelioRuntime,
    lease_client: Arc<dyn NodeletClient>,
    client_factory: ClientFactory,
    in_memory_store: Arc<CoreWorkerMemoryStore>,
    resolver: LocalDependencyResolver,
    state: Mutex<SubmitterState>,
}

impl DirectTaskSubmitter {
    pub fn new(
        runtime: HelioRuntime,
        lease_client: Arc<dyn NodeletClient>,
        client_factory: ClientFactory,
        in_memory_store: Arc<CoreWorkerMemoryStore>,
    ) -> Self {
        Self {
            runtime,
            lease_client,
            client_factory,
            resolver: LocalDependencyResolver::new(Arc::clone(&in_memory_store)),
            in_memory_store,
            state: Mutex::new(SubmitterState {
                queued_tasks: VecDeque::new(),
                client_cache: HashMap::new(),
                worker_request_pending: false,
            }),
        }
    }

    /// Submit a task. Returns once dependency resolution has started;
    /// dispatch happens asynchronously.
    pub fn submit_task(self: &Arc<Self>, task: rpc::TaskSpec) -> CoreWorkerResult<()> {
        let this = Arc::clone(self);
        self.resolver.resolve_dependencies(task, move |task| {
            let mut state = this.state.lock();
            this.request_new_worker_if_needed(&mut state, &task);
            state.queued_tasks.push_back(task);
            // The task will be picked up by the next granted or newly idle
            // worker; the lease request above guarantees one shows up.
        });
        Ok(())
    }

    /// Number of tasks still waiting on dependency resolution.
    pub fn num_pending_resolutions(&self) -> usize {
        self.resolver.num_pending_tasks()
    }

    /// Number of resolved tasks waiting for a worker.
    pub fn num_queued_tasks(&self) -> usize {
        self.state.lock().queued_tasks.len()
    }

    /// Issue a worker-lease request unless one is already outstanding.
    /// The single queue needs only a single pipelined request.
    fn request_new_worker_if_needed(
        self: &Arc<Self>,
        state: &mut SubmitterState,
        resource_spec: &rpc::TaskSpec,
    ) {
        if state.worker_request_pending {
            return;
        }
        state.worker_request_pending = true;

        let req = rpc::RequestWorkerLeaseRequest {
            resource_spec: Some(resource_spec.clone()),
        };
        let this = Arc::clone(self);
        self.runtime.spawn(async move {
            let reply = match this.lease_client.request_worker_lease(req).await {
                Ok(reply) => reply,
                Err(status) => {
                    tracing::error!(%status, "worker lease request failed");
                    panic!("worker lease request failed: {status}");
                }
            };
            match reply.worker_address {
                Some(addr) => this.handle_worker_lease_granted(WorkerAddress::from(addr)),
                None => {
                    tracing::error!("worker lease granted without a worker address");
                    panic!("worker lease granted without a worker address");
                }
            }
        });
    }

    /// Lease-grant callback: cache a client for the worker and put it to
    /// work.
    pub fn handle_worker_lease_granted(self: &Arc<Self>, addr: WorkerAddress) {
        {
            let mut state = self.state.lock();
            state.worker_request_pending = false;

            if !state.client_cache.contains_key(&addr) {
                let client = (self.client_factory)(&addr);
                state.client_cache.insert(addr.clone(), client);
                tracing::info!("Connected to {}:{}", addr.ip_address, addr.port);
            }
        }
        self.on_worker_idle(addr, /*was_error=*/ false);
    }

    /// A worker became idle: give it the queue head, or return it to the
    /// nodelet. An errored worker is returned eagerly; the failure almost
    /// always means the worker died.
    fn on_worker_idle(self: &Arc<Self>, addr: WorkerAddress, was_error: bool) {
        let mut state = self.state.lock();
        if state.queued_tasks.is_empty() || was_error {
            self.return_worker(addr.port);
        } else if let Some(task) = state.queued_tasks.pop_front() {
            let client = Arc::clone(
                state
                    .client_cache
                    .get(&addr)
                    .expect("leased worker has no cached client"),
            );
            self.push_normal_task(&addr, client, task);
        }
        // Still a queue of tasks: keep a lease request in flight.
        if let Some(front) = state.queued_tasks.front().cloned() {
            self.request_new_worker_if_needed(&mut state, &front);
        }
    }

    fn return_worker(self: &Arc<Self>, worker_port: i32) {
        let this = Arc::clone(self);
        self.runtime.spawn(async move {
            let req = rpc::ReturnWorkerRequest { worker_port };
            if let Err(status) = this.lease_client.return_worker(req).await {
                tracing::error!(%status, worker_port, "returning worker to the nodelet failed");
                panic!("returning worker {worker_port} failed: {status}");
            }
        });
    }

    /// Push one task to a worker. May be called with the submitter lock
    /// held; the RPC itself and its completion run on the runtime.
    fn push_normal_task(
        self: &Arc<Self>,
        addr: &WorkerAddress,
        client: Arc<dyn CoreWorkerClient>,
        task: rpc::TaskSpec,
    ) {
        let task_id = TaskID::from_binary(&task.task_id);
        let num_returns = task.num_returns;
        // The payload moves into the request. A failed push fails the task
        // rather than retrying, so nothing needs the spec afterwards.
        let request = rpc::PushTaskRequest {
            task_spec: Some(task),
        };

        let this = Arc::clone(self);
        let addr = addr.clone();
        self.runtime.spawn(async move {
            let result = client.push_normal_task(request).await;
            // Frees the worker slot first: drives the next dispatch or the
            // worker's return before the store writes below.
            this.on_worker_idle(addr, /*was_error=*/ result.is_err());
            match result {
                Ok(reply) => write_objects_to_memory_store(&reply, &this.in_memory_store),
                Err(status) => {
                    tracing::warn!(%task_id, %status, "pushing task to worker failed");
                    treat_task_as_failed(
                        &task_id,
                        num_returns,
                        rpc::ErrorType::WorkerDied,
                        &this.in_memory_store,
                    );
                }
            }
        });
    }
}

/// Write a synthetic failure object under each of the task's return ids so
/// that waiters unblock.
pub fn treat_task_as_failed(
    task_id: &TaskID,
    num_returns: u64,
    error_type: rpc::ErrorType,
    in_memory_store: &CoreWorkerMemoryStore,
) {
    tracing::debug!(%task_id, num_returns, ?error_type, "treating task as failed");
    for i in 0..num_returns {
        let object_id = ObjectID::for_task_return(task_id, i as u32 + 1);
        // A value may already be present for this id; the first write wins.
        let _ = in_memory_store.put(object_id, HelioObject::from_error(error_type));
    }
}

/// Store the return objects of a completed task. Values that stayed in
/// plasma are recorded as plasma placeholders.
pub fn write_objects_to_memory_store(
    reply: &rpc::PushTaskReply,
    in_memory_store: &CoreWorkerMemoryStore,
) {
    for return_object in &reply.return_objects {
        let object_id = ObjectID::from_binary(&return_object.object_id);
        let object = if return_object.in_plasma {
            HelioObject::from_error(rpc::ErrorType::ObjectInPlasma)
        } else {
            HelioObject::new(
                Bytes::copy_from_slice(&return_object.data),
                Bytes::copy_from_slice(&return_object.metadata),
            )
        };
        let _ = in_memory_store.put(object_id, object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use helio_test_utils::mock_clients::{FakeCoreWorkerClient, FakeNodeletClient};
    use helio_test_utils::proto_builders::build_task_spec;
    use helio_test_utils::wait::wait_for_condition;

    fn make_submitter(
        lease_client: Arc<FakeNodeletClient>,
        worker_client: Arc<FakeCoreWorkerClient>,
    ) -> (Arc<DirectTaskSubmitter>, Arc<CoreWorkerMemoryStore>, Arc<AtomicUsize>) {
        let store = Arc::new(CoreWorkerMemoryStore::new());
        let factory_calls = Arc::new(AtomicUsize::new(0));
        let factory_calls2 = Arc::clone(&factory_calls);
        let submitter = Arc::new(DirectTaskSubmitter::new(
            HelioRuntime::current(),
            lease_client,
            Box::new(move |_addr| {
                factory_calls2.fetch_add(1, Ordering::SeqCst);
                Arc::clone(&worker_client) as Arc<dyn CoreWorkerClient>
            }),
            Arc::clone(&store),
        ));
        (submitter, store, factory_calls)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_requests_one_lease() {
        let lease_client = Arc::new(FakeNodeletClient::new());
        let worker_client = Arc::new(FakeCoreWorkerClient::new());
        let (submitter, _store, _) = make_submitter(Arc::clone(&lease_client), worker_client);

        for i in 0..3 {
            let task = build_task_spec(&format!("task_{i}"), 1, vec![]);
            submitter.submit_task(task).unwrap();
        }
        assert_eq!(submitter.num_queued_tasks(), 3);
        assert_eq!(submitter.num_pending_resolutions(), 0);

        assert!(wait_for_condition(|| lease_client.num_lease_requests() == 1, 1000).await);
        // One request serves the whole queue until granted.
        assert_eq!(lease_client.num_lease_requests(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_granted_worker_with_empty_queue_is_returned() {
        let lease_client = Arc::new(FakeNodeletClient::new());
        let worker_client = Arc::new(FakeCoreWorkerClient::new());
        let (submitter, _store, factory_calls) =
            make_submitter(Arc::clone(&lease_client), worker_client);

        let addr = WorkerAddress {
            ip_address: "10.0.0.1".to_string(),
            port: 7001,
        };
        submitter.handle_worker_lease_granted(addr);

        assert!(wait_for_condition(|| lease_client.returned_worker_ports() == vec![7001], 1000).await);
        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_client_cache_reused_per_address() {
        let lease_client = Arc::new(FakeNodeletClient::new());
        let worker_client = Arc::new(FakeCoreWorkerClient::new());
        let (submitter, _store, factory_calls) =
            make_submitter(Arc::clone(&lease_client), worker_client);

        let addr = WorkerAddress {
            ip_address: "10.0.0.1".to_string(),
            port: 7001,
        };
        submitter.handle_worker_lease_granted(addr.clone());
        submitter.handle_worker_lease_granted(addr);

        assert!(wait_for_condition(|| lease_client.num_returned_workers() == 2, 1000).await);
        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_grant_dispatches_queue_head() {
        let lease_client = Arc::new(FakeNodeletClient::new());
        let worker_client = Arc::new(FakeCoreWorkerClient::new());
        let (submitter, _store, _) =
            make_submitter(Arc::clone(&lease_client), Arc::clone(&worker_client));

        submitter
            .submit_task(build_task_spec("head", 1, vec![]))
            .unwrap();
        assert!(wait_for_condition(|| lease_client.num_lease_requests() == 1, 1000).await);
        assert!(lease_client.grant_worker_lease("10.0.0.1", 7001));

        assert!(wait_for_condition(|| worker_client.num_pushed_tasks() == 1, 1000).await);
        let pushed = worker_client.pushed_task(0).unwrap();
        assert_eq!(pushed.task_spec.unwrap().name, "head");
        assert_eq!(submitter.num_queued_tasks(), 0);
    }
}
