// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Shared test helpers for Helio crates.

pub mod mock_clients;
pub mod proto_builders;
pub mod wait;

use helio_common::id::{JobID, ObjectID, TaskID};

/// Initialize tracing for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Create a random JobID for testing.
pub fn random_job_id() -> JobID {
    JobID::from_int(rand::random::<u16>() as u32 + 1)
}

/// Create a random TaskID for testing.
pub fn random_task_id() -> TaskID {
    TaskID::for_normal_task(&random_job_id(), &TaskID::nil(), rand::random::<u16>() as usize)
}

/// Create a random direct-call ObjectID for testing.
pub fn random_direct_object_id() -> ObjectID {
    ObjectID::for_task_return(&random_task_id(), 1)
}
