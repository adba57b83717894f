// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Core worker logic: the in-memory object store for direct-call objects,
//! dependency resolution for task arguments, and the direct task submitter
//! that leases workers from the nodelet and pushes tasks to them.

pub mod dependency_resolver;
pub mod direct_task_submitter;
pub mod error;
pub mod memory_store;
