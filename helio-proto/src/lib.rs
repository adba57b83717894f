// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Protobuf message types for Helio's RPC boundary.
//!
//! Maintained by hand rather than generated; field tags are part of the
//! wire contract and must stay stable.

pub mod rpc;
