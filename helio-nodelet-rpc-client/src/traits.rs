// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async trait for the nodelet lease client.

use helio_proto::rpc;
use tonic::Status;

/// Async trait for nodelet worker-lease RPC operations.
///
/// The wire transport lives behind this trait; the core worker only needs
/// these two calls.
#[async_trait::async_trait]
pub trait NodeletClient: Send + Sync {
    /// Request a worker lease. The reply carries the address of the
    /// granted worker; an error is the lease service refusing the request.
    async fn request_worker_lease(
        &self,
        req: rpc::RequestWorkerLeaseRequest,
    ) -> Result<rpc::RequestWorkerLeaseReply, Status>;

    /// Return a previously leased worker to the nodelet.
    async fn return_worker(
        &self,
        req: rpc::ReturnWorkerRequest,
    ) -> Result<rpc::ReturnWorkerReply, Status>;
}
