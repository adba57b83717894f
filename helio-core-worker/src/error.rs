// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Core worker error types.
//!
//! The store is single-assignment, so a duplicate put is the one
//! recoverable error this crate reports; contract violations panic and
//! timeouts are carried in-band by `GetResult`.

/// Errors specific to the core worker.
#[derive(Debug, thiserror::Error)]
pub enum CoreWorkerError {
    #[error("object already exists: {0}")]
    ObjectExists(String),
}

/// Result type alias for core worker operations.
pub type CoreWorkerResult<T> = Result<T, CoreWorkerError>;
