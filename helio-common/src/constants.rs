// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Shared constants.

/// Length of full-length Helio unique IDs in bytes.
pub const UNIQUE_ID_SIZE: usize = 28;

/// Object index bit width, including the transport flag bit.
pub const OBJECT_ID_INDEX_SIZE: usize = 32;

/// Helio version string.
pub const HELIO_VERSION: &str = "0.1.0";

/// Environment variable carrying the serialized config blob.
pub const ENV_VAR_KEY_CONFIG: &str = "HELIO_CONFIG";

/// Environment variable carrying the job id of the current driver.
pub const ENV_VAR_KEY_JOB_ID: &str = "HELIO_JOB_ID";
