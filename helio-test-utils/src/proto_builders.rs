// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Proto message builders producing realistic task specs for tests.

use std::collections::HashMap;

use helio_common::id::ObjectID;
use helio_proto::rpc;

use crate::random_task_id;

/// Build a task spec with a fresh task id and one CPU required.
pub fn build_task_spec(name: &str, num_returns: u64, args: Vec<rpc::TaskArg>) -> rpc::TaskSpec {
    rpc::TaskSpec {
        task_id: random_task_id().binary(),
        name: name.to_string(),
        num_returns,
        required_resources: HashMap::from([("CPU".to_string(), 1.0)]),
        args,
    }
}

/// An argument referencing an object by id.
pub fn object_ref_arg(object_id: &ObjectID) -> rpc::TaskArg {
    rpc::TaskArg {
        object_ids: vec![object_id.binary()],
        ..Default::default()
    }
}

/// An argument carrying an inline value.
pub fn inline_arg(data: &[u8]) -> rpc::TaskArg {
    rpc::TaskArg {
        data: data.to_vec(),
        ..Default::default()
    }
}

/// A return object carrying inline bytes.
pub fn return_object(object_id: &ObjectID, data: &[u8]) -> rpc::ReturnObject {
    rpc::ReturnObject {
        object_id: object_id.binary(),
        data: data.to_vec(),
        ..Default::default()
    }
}
