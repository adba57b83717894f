// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Helio runtime configuration.
//!
//! A plain struct with defaults, overridable from:
//! - a base64-encoded JSON string handed down by the process launcher
//! - `HELIO_<UPPER_SNAKE_CASE_NAME>` environment variables

use std::sync::OnceLock;

use base64::Engine;
use serde::Deserialize;

static HELIO_CONFIG: OnceLock<HelioConfig> = OnceLock::new();

/// Get the global config, initializing from the environment on first use.
pub fn helio_config() -> &'static HelioConfig {
    HELIO_CONFIG.get_or_init(HelioConfig::from_env)
}

/// Initialize the global config from a base64-encoded JSON string.
/// Returns an error if already initialized.
pub fn initialize_config(config_str: Option<&str>) -> Result<(), String> {
    let config = match config_str {
        Some(s) if !s.is_empty() => HelioConfig::from_base64_json(s)?,
        _ => HelioConfig::from_env(),
    };
    HELIO_CONFIG
        .set(config)
        .map_err(|_| "HelioConfig already initialized".to_string())
}

/// Runtime configuration parameters.
///
/// Only the knobs the core worker consults are defined; the set grows as
/// components land.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HelioConfig {
    /// While a `get` waits with no deadline, log a warning at this interval.
    pub get_warn_interval_ms: u64,
}

impl Default for HelioConfig {
    fn default() -> Self {
        Self {
            get_warn_interval_ms: 10_000,
        }
    }
}

impl HelioConfig {
    /// Decode a base64-encoded JSON config blob.
    pub fn from_base64_json(encoded: &str) -> Result<Self, String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| format!("config is not valid base64: {e}"))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("config is not valid JSON: {e}"))
    }

    /// Defaults, with `HELIO_*` environment variable overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_u64("HELIO_GET_WARN_INTERVAL_MS") {
            config.get_warn_interval_ms = v;
        }
        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::error!(key, %raw, "ignoring unparseable config override");
            None
        }
    }
}
