// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async trait for the core-worker task-push client.

use helio_proto::rpc;
use tonic::Status;

/// Async trait for pushing tasks to a leased worker.
///
/// Implementations must be safe to share across concurrent pushes to the
/// same worker.
#[async_trait::async_trait]
pub trait CoreWorkerClient: Send + Sync {
    /// Push a normal (non-actor) task to the worker and wait for its
    /// execution reply.
    async fn push_normal_task(
        &self,
        req: rpc::PushTaskRequest,
    ) -> Result<rpc::PushTaskReply, Status>;
}
