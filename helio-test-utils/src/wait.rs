// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async-aware wait utilities for tests.

use std::future::{self, Future};
use std::time::Duration;

/// How often conditions are re-checked while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll a synchronous condition until it holds, giving up after
/// `timeout_ms`. Returns whether the condition was met in time.
pub async fn wait_for_condition<F>(condition: F, timeout_ms: u64) -> bool
where
    F: Fn() -> bool,
{
    wait_for_condition_async(|| future::ready(condition()), timeout_ms).await
}

/// Poll an async condition until it holds, giving up after `timeout_ms`.
/// Returns whether the condition was met in time.
pub async fn wait_for_condition_async<F, Fut>(condition: F, timeout_ms: u64) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let poll_until_true = async {
        while !condition().await {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    match tokio::time::timeout(Duration::from_millis(timeout_ms), poll_until_true).await {
        Ok(()) => true,
        Err(_elapsed) => {
            tracing::debug!(timeout_ms, "condition not met before deadline");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_condition_already_true() {
        assert!(wait_for_condition(|| true, 1000).await);
    }

    #[tokio::test]
    async fn test_condition_never_true_times_out() {
        assert!(!wait_for_condition(|| false, 50).await);
    }

    #[tokio::test]
    async fn test_condition_becomes_true_while_polling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let polls2 = Arc::clone(&polls);
        // True on the third check, well before the deadline.
        let met = wait_for_condition(|| polls2.fetch_add(1, Ordering::SeqCst) >= 2, 1000).await;
        assert!(met);
        assert!(polls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_async_condition_waits_for_background_work() {
        let flag = Arc::new(AtomicUsize::new(0));
        let flag2 = Arc::clone(&flag);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            flag2.store(1, Ordering::SeqCst);
        });

        let flag3 = Arc::clone(&flag);
        let met = wait_for_condition_async(
            move || {
                let flag = Arc::clone(&flag3);
                async move { flag.load(Ordering::SeqCst) == 1 }
            },
            1000,
        )
        .await;
        assert!(met);
    }

    #[tokio::test]
    async fn test_async_condition_times_out() {
        assert!(!wait_for_condition_async(|| async { false }, 50).await);
    }
}
