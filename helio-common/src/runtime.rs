// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async runtime wrapper.
//!
//! Components that are driven by callbacks on arbitrary threads hold a
//! `HelioRuntime` so they can launch RPC futures without being inside the
//! runtime themselves.

use std::future::Future;
use tokio::task::JoinHandle;

/// A cloneable handle to the process's tokio runtime.
#[derive(Clone)]
pub struct HelioRuntime {
    handle: tokio::runtime::Handle,
}

impl HelioRuntime {
    /// Create from the current tokio runtime handle. Panics outside a
    /// runtime context.
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Create from an explicit handle.
    pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawn a future on the runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// The underlying tokio handle.
    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }
}
