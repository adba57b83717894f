// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Fake RPC clients for unit and integration tests.
//!
//! Both fakes record every request for inspection and park the call until
//! the test scripts its outcome (`grant_worker_lease`, `reply_to_next_push`),
//! so tests control the exact interleaving of grants and completions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tonic::Status;

use helio_nodelet_rpc_client::NodeletClient;
use helio_proto::rpc;
use helio_worker_rpc_client::CoreWorkerClient;

/// A fake nodelet that parks lease requests until the test grants them and
/// records returned workers.
pub struct FakeNodeletClient {
    lease_requests: Mutex<Vec<rpc::RequestWorkerLeaseRequest>>,
    pending_grants: Mutex<VecDeque<oneshot::Sender<rpc::RequestWorkerLeaseReply>>>,
    num_lease_requests: AtomicUsize,
    returned_workers: Mutex<Vec<i32>>,
}

impl FakeNodeletClient {
    pub fn new() -> Self {
        Self {
            lease_requests: Mutex::new(Vec::new()),
            pending_grants: Mutex::new(VecDeque::new()),
            num_lease_requests: AtomicUsize::new(0),
            returned_workers: Mutex::new(Vec::new()),
        }
    }

    /// Total lease requests observed so far.
    pub fn num_lease_requests(&self) -> usize {
        self.num_lease_requests.load(Ordering::SeqCst)
    }

    /// Lease requests that have not been granted yet.
    pub fn num_pending_lease_requests(&self) -> usize {
        self.pending_grants.lock().len()
    }

    /// The `i`-th observed lease request.
    pub fn lease_request(&self, i: usize) -> Option<rpc::RequestWorkerLeaseRequest> {
        self.lease_requests.lock().get(i).cloned()
    }

    /// Grant the oldest pending lease request with the given worker
    /// address. Returns false if no request is pending.
    pub fn grant_worker_lease(&self, ip_address: &str, port: i32) -> bool {
        let sender = self.pending_grants.lock().pop_front();
        match sender {
            Some(sender) => {
                let reply = rpc::RequestWorkerLeaseReply {
                    worker_address: Some(rpc::Address {
                        ip_address: ip_address.to_string(),
                        port,
                        ..Default::default()
                    }),
                };
                sender.send(reply).is_ok()
            }
            None => false,
        }
    }

    pub fn num_returned_workers(&self) -> usize {
        self.returned_workers.lock().len()
    }

    /// Ports of returned workers, in return order.
    pub fn returned_worker_ports(&self) -> Vec<i32> {
        self.returned_workers.lock().clone()
    }
}

impl Default for FakeNodeletClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NodeletClient for FakeNodeletClient {
    async fn request_worker_lease(
        &self,
        req: rpc::RequestWorkerLeaseRequest,
    ) -> Result<rpc::RequestWorkerLeaseReply, Status> {
        let (tx, rx) = oneshot::channel();
        self.lease_requests.lock().push(req);
        self.pending_grants.lock().push_back(tx);
        // Counter increments last so a test that saw it can already grant.
        self.num_lease_requests.fetch_add(1, Ordering::SeqCst);

        match rx.await {
            Ok(reply) => Ok(reply),
            Err(_) => Err(Status::unavailable("fake nodelet dropped the lease")),
        }
    }

    async fn return_worker(
        &self,
        req: rpc::ReturnWorkerRequest,
    ) -> Result<rpc::ReturnWorkerReply, Status> {
        self.returned_workers.lock().push(req.worker_port);
        Ok(rpc::ReturnWorkerReply::default())
    }
}

/// A fake worker that records pushed tasks and parks each push until the
/// test supplies its outcome.
pub struct FakeCoreWorkerClient {
    pushed_tasks: Mutex<Vec<rpc::PushTaskRequest>>,
    pending_replies: Mutex<VecDeque<oneshot::Sender<Result<rpc::PushTaskReply, Status>>>>,
    num_pushed_tasks: AtomicUsize,
}

impl FakeCoreWorkerClient {
    pub fn new() -> Self {
        Self {
            pushed_tasks: Mutex::new(Vec::new()),
            pending_replies: Mutex::new(VecDeque::new()),
            num_pushed_tasks: AtomicUsize::new(0),
        }
    }

    /// Total pushes observed so far.
    pub fn num_pushed_tasks(&self) -> usize {
        self.num_pushed_tasks.load(Ordering::SeqCst)
    }

    /// Pushes that have not been completed yet.
    pub fn num_inflight_tasks(&self) -> usize {
        self.pending_replies.lock().len()
    }

    /// The `i`-th pushed request.
    pub fn pushed_task(&self, i: usize) -> Option<rpc::PushTaskRequest> {
        self.pushed_tasks.lock().get(i).cloned()
    }

    /// Names of all pushed tasks, in push order.
    pub fn pushed_task_names(&self) -> Vec<String> {
        self.pushed_tasks
            .lock()
            .iter()
            .filter_map(|req| req.task_spec.as_ref().map(|spec| spec.name.clone()))
            .collect()
    }

    /// Complete the oldest in-flight push with the given outcome. Returns
    /// false if nothing is in flight.
    pub fn reply_to_next_push(&self, result: Result<rpc::PushTaskReply, Status>) -> bool {
        let sender = self.pending_replies.lock().pop_front();
        match sender {
            Some(sender) => sender.send(result).is_ok(),
            None => false,
        }
    }
}

impl Default for FakeCoreWorkerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CoreWorkerClient for FakeCoreWorkerClient {
    async fn push_normal_task(
        &self,
        req: rpc::PushTaskRequest,
    ) -> Result<rpc::PushTaskReply, Status> {
        let (tx, rx) = oneshot::channel();
        self.pushed_tasks.lock().push(req);
        self.pending_replies.lock().push_back(tx);
        self.num_pushed_tasks.fetch_add(1, Ordering::SeqCst);

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Status::unavailable("fake worker dropped the push")),
        }
    }
}
