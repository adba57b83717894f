// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Messages exchanged between core workers and the nodelet.

use std::collections::HashMap;

/// The RPC endpoint of a worker or driver process.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Address {
    #[prost(string, tag = "1")]
    pub ip_address: ::prost::alloc::string::String,
    #[prost(int32, tag = "2")]
    pub port: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub node_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub worker_id: ::prost::alloc::vec::Vec<u8>,
}

/// A single task argument: either a list of referenced object ids or an
/// inline value. Inlining a referenced argument clears `object_ids` and
/// fills `data`/`metadata` in place.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskArg {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub object_ids: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub metadata: ::prost::alloc::vec::Vec<u8>,
}

/// The full specification of a task to execute.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskSpec {
    #[prost(bytes = "vec", tag = "1")]
    pub task_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub num_returns: u64,
    #[prost(map = "string, double", tag = "4")]
    pub required_resources: HashMap<::prost::alloc::string::String, f64>,
    #[prost(message, repeated, tag = "5")]
    pub args: ::prost::alloc::vec::Vec<TaskArg>,
}

/// Ask the nodelet for a worker capable of running `resource_spec`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestWorkerLeaseRequest {
    #[prost(message, optional, tag = "1")]
    pub resource_spec: ::core::option::Option<TaskSpec>,
}

/// A granted lease carries the address of the leased worker.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestWorkerLeaseReply {
    #[prost(message, optional, tag = "1")]
    pub worker_address: ::core::option::Option<Address>,
}

/// Relinquish a leased worker, identified by its listening port.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReturnWorkerRequest {
    #[prost(int32, tag = "1")]
    pub worker_port: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReturnWorkerReply {}

/// Push a task to a leased worker for execution.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushTaskRequest {
    #[prost(message, optional, tag = "1")]
    pub task_spec: ::core::option::Option<TaskSpec>,
}

/// One return value of an executed task. Large values stay in plasma and
/// come back with `in_plasma` set instead of inline bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReturnObject {
    #[prost(bytes = "vec", tag = "1")]
    pub object_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub metadata: ::prost::alloc::vec::Vec<u8>,
    #[prost(bool, tag = "4")]
    pub in_plasma: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushTaskReply {
    #[prost(message, repeated, tag = "1")]
    pub return_objects: ::prost::alloc::vec::Vec<ReturnObject>,
}

/// Failure categories recorded as the metadata of synthetic error objects.
/// The numeric values are shared with every language binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorType {
    WorkerDied = 0,
    ActorDied = 1,
    ObjectUnreconstructable = 2,
    TaskExecutionException = 3,
    ObjectInPlasma = 4,
}
