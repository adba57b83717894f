// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Fixed-width binary ID types.
//!
//! ID hierarchy:
//! - `JobID` (4 bytes)
//! - `ActorID` (16 bytes = 12 unique + 4 JobID)
//! - `TaskID` (24 bytes = 8 unique + 16 ActorID)
//! - `ObjectID` (28 bytes = 4-byte index word + 24 TaskID)
//! - `UniqueID` / `WorkerID` / `NodeID` (28 bytes)
//!
//! The hash function and the object-id bit layout are wire-compatible
//! contracts; do not change them without bumping the protocol version.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::constants::UNIQUE_ID_SIZE;

// ─── MurmurHash64A ──────────────────────────────────────────────────────────
// Must match the reference implementation exactly for cross-language hashing.

fn murmur_hash_64a(key: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4a7935bd1e995;
    const R: i32 = 47;

    let len = key.len();
    let mut h: u64 = seed ^ ((len as u64).wrapping_mul(M));

    let n_blocks = len / 8;
    for i in 0..n_blocks {
        let offset = i * 8;
        let mut k = u64::from_le_bytes(key[offset..offset + 8].try_into().unwrap());

        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = &key[n_blocks * 8..];
    let remaining = len & 7;
    if remaining >= 7 {
        h ^= (tail[6] as u64) << 48;
    }
    if remaining >= 6 {
        h ^= (tail[5] as u64) << 40;
    }
    if remaining >= 5 {
        h ^= (tail[4] as u64) << 32;
    }
    if remaining >= 4 {
        h ^= (tail[3] as u64) << 24;
    }
    if remaining >= 3 {
        h ^= (tail[2] as u64) << 16;
    }
    if remaining >= 2 {
        h ^= (tail[1] as u64) << 8;
    }
    if remaining >= 1 {
        h ^= tail[0] as u64;
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;

    h
}

// ─── ID Macro ────────────────────────────────────────────────────────────────

/// Generates a fixed-size ID type.
///
/// Each ID is a `[u8; N]` newtype with:
/// - `from_binary` / `from_hex` / `from_random` constructors
/// - `binary()` / `hex()` / `data()` accessors
/// - `Hash`, `Eq`, `PartialEq`, `Clone`, `Copy`, `Debug`, `Display`
/// - `nil()` default (all 0xFF bytes)
macro_rules! define_helio_id {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy)]
        #[repr(C)]
        pub struct $name {
            data: [u8; $size],
        }

        impl $name {
            /// The fixed byte size of this ID type.
            pub const SIZE: usize = $size;

            /// Create a nil ID (all 0xFF bytes).
            pub const fn nil() -> Self {
                Self {
                    data: [0xFF; $size],
                }
            }

            /// Create an ID from raw bytes. Panics if `bytes.len() != SIZE`.
            pub fn from_binary(bytes: &[u8]) -> Self {
                assert_eq!(
                    bytes.len(),
                    $size,
                    "expected {} bytes for {}, got {}",
                    $size,
                    stringify!($name),
                    bytes.len()
                );
                let mut data = [0u8; $size];
                data.copy_from_slice(bytes);
                Self { data }
            }

            /// Create an ID from a hex string. Returns `nil()` on invalid input.
            pub fn from_hex(hex_str: &str) -> Self {
                if hex_str.len() != $size * 2 {
                    tracing::error!(
                        "incorrect hex string length for {}: expected {}, got {}",
                        stringify!($name),
                        $size * 2,
                        hex_str.len()
                    );
                    return Self::nil();
                }
                match hex::decode(hex_str) {
                    Ok(bytes) => Self::from_binary(&bytes),
                    Err(_) => {
                        tracing::error!("invalid hex string for {}", stringify!($name));
                        Self::nil()
                    }
                }
            }

            /// Create a random ID.
            pub fn from_random() -> Self {
                let mut data = [0u8; $size];
                helio_util::random::fill_random(&mut data);
                Self { data }
            }

            /// Returns true if this is the nil ID (all 0xFF).
            pub fn is_nil(&self) -> bool {
                self.data == [0xFF; $size]
            }

            /// Raw byte array reference.
            pub fn data(&self) -> &[u8; $size] {
                &self.data
            }

            /// Raw bytes as `&[u8]`.
            pub fn as_bytes(&self) -> &[u8] {
                &self.data
            }

            /// Owned copy of the bytes.
            pub fn binary(&self) -> Vec<u8> {
                self.data.to_vec()
            }

            /// Hex-encoded string (lowercase).
            pub fn hex(&self) -> String {
                hex::encode(self.data)
            }

            /// MurmurHash64A of the id bytes (seed 0).
            pub fn murmur_hash(&self) -> u64 {
                murmur_hash_64a(&self.data, 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.data == other.data
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                // Hash the murmur output so the cross-language hash is the
                // one observable value, whatever hasher the map uses.
                self.murmur_hash().hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.data
            }
        }
    };
}

// ─── ID Type Definitions ────────────────────────────────────────────────────

define_helio_id!(UniqueID, UNIQUE_ID_SIZE);
define_helio_id!(JobID, 4);
define_helio_id!(ActorID, 16);
define_helio_id!(TaskID, 24);
define_helio_id!(ObjectID, 28);
define_helio_id!(WorkerID, UNIQUE_ID_SIZE);
define_helio_id!(NodeID, UNIQUE_ID_SIZE);

// ─── JobID extras ───────────────────────────────────────────────────────────

impl JobID {
    /// Create a JobID from a u32 integer.
    pub fn from_int(value: u32) -> Self {
        Self {
            data: value.to_be_bytes(),
        }
    }

    /// Convert to a u32 integer.
    pub fn to_int(&self) -> u32 {
        u32::from_be_bytes(self.data)
    }
}

// ─── ActorID extras ─────────────────────────────────────────────────────────

impl ActorID {
    const UNIQUE_BYTES_LENGTH: usize = 12;

    /// Create an ActorID from a job ID and the hashed parent-task info.
    pub fn of(job_id: &JobID, parent_task_id: &TaskID, parent_task_counter: usize) -> Self {
        let mut data = [0u8; 16];

        let mut hash_input = Vec::with_capacity(TaskID::SIZE + 8);
        hash_input.extend_from_slice(parent_task_id.as_bytes());
        hash_input.extend_from_slice(&(parent_task_counter as u64).to_le_bytes());

        let hash = murmur_hash_64a(&hash_input, 0);
        data[..8].copy_from_slice(&hash.to_le_bytes());
        let hash2 = murmur_hash_64a(&hash.to_le_bytes(), 1);
        data[8..Self::UNIQUE_BYTES_LENGTH].copy_from_slice(&hash2.to_le_bytes()[..4]);

        data[Self::UNIQUE_BYTES_LENGTH..].copy_from_slice(job_id.data());

        Self { data }
    }

    /// Extract the embedded JobID (last 4 bytes).
    pub fn job_id(&self) -> JobID {
        JobID::from_binary(&self.data[Self::UNIQUE_BYTES_LENGTH..])
    }
}

// ─── TaskID extras ──────────────────────────────────────────────────────────

impl TaskID {
    const UNIQUE_BYTES_LENGTH: usize = 8;

    /// Create a TaskID for a normal (non-actor) task.
    pub fn for_normal_task(
        job_id: &JobID,
        parent_task_id: &TaskID,
        parent_task_counter: usize,
    ) -> Self {
        let mut data = [0u8; 24];

        let mut hash_input = Vec::with_capacity(TaskID::SIZE + 8);
        hash_input.extend_from_slice(parent_task_id.as_bytes());
        hash_input.extend_from_slice(&(parent_task_counter as u64).to_le_bytes());
        let hash = murmur_hash_64a(&hash_input, 0);

        data[..Self::UNIQUE_BYTES_LENGTH].copy_from_slice(&hash.to_le_bytes());
        data[Self::UNIQUE_BYTES_LENGTH..].copy_from_slice(ActorID::of(job_id, parent_task_id, 0).data());

        Self { data }
    }

    /// Create the TaskID of the driver task for a given job.
    pub fn for_driver_task(job_id: &JobID) -> Self {
        let actor_id = ActorID::of(job_id, &TaskID::nil(), 0);
        let mut data = [0u8; 24];
        data[Self::UNIQUE_BYTES_LENGTH..].copy_from_slice(actor_id.data());
        Self { data }
    }

    /// Extract the embedded ActorID (last 16 bytes).
    pub fn actor_id(&self) -> ActorID {
        ActorID::from_binary(&self.data[Self::UNIQUE_BYTES_LENGTH..])
    }

    /// Extract the embedded JobID (via the ActorID).
    pub fn job_id(&self) -> JobID {
        self.actor_id().job_id()
    }
}

// ─── ObjectID extras ────────────────────────────────────────────────────────

/// Transport subspace of an object id: where the object's value lives and
/// how task arguments referencing it are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTransportType {
    /// The object lives in plasma and is fetched through the nodelet.
    Nodelet,
    /// The object lives in the owning worker's in-memory store.
    Direct,
}

impl ObjectID {
    const INDEX_BYTES_LENGTH: usize = 4;

    /// Most significant bit of the big-endian index word. Set means the id
    /// is in the direct-call subspace; clear means nodelet/plasma transport.
    /// All other bits are shared between the two subspaces.
    const DIRECT_CALL_FLAG: u8 = 0x80;

    /// Maximum number of objects returnable by a single task.
    pub const MAX_OBJECT_INDEX: u32 = (1 << 31) - 1;

    /// Create an ObjectID from a TaskID, an object index, and a transport.
    pub fn from_index(task_id: &TaskID, index: u32, transport: TaskTransportType) -> Self {
        assert!(
            index <= Self::MAX_OBJECT_INDEX,
            "object index {index} exceeds MAX_OBJECT_INDEX"
        );
        let mut data = [0u8; 28];
        data[..Self::INDEX_BYTES_LENGTH].copy_from_slice(&index.to_be_bytes());
        data[Self::INDEX_BYTES_LENGTH..].copy_from_slice(task_id.data());
        let id = Self { data };
        id.with_transport(transport)
    }

    /// The id of the `index`-th return value (1-based) of a direct-call task.
    pub fn for_task_return(task_id: &TaskID, index: u32) -> Self {
        Self::from_index(task_id, index, TaskTransportType::Direct)
    }

    /// Get the object index, masking off the transport flag.
    pub fn object_index(&self) -> u32 {
        let mut word: [u8; 4] = self.data[..Self::INDEX_BYTES_LENGTH].try_into().unwrap();
        word[0] &= !Self::DIRECT_CALL_FLAG;
        u32::from_be_bytes(word)
    }

    /// Extract the embedded TaskID (last 24 bytes).
    pub fn task_id(&self) -> TaskID {
        TaskID::from_binary(&self.data[Self::INDEX_BYTES_LENGTH..])
    }

    /// Whether this id is in the direct-call subspace (eligible for the
    /// in-memory store).
    pub fn is_direct_call_type(&self) -> bool {
        self.data[0] & Self::DIRECT_CALL_FLAG != 0
    }

    /// Rewrite this id into the given transport subspace. Only the
    /// transport bit changes; every other bit is preserved.
    pub fn with_transport(&self, transport: TaskTransportType) -> Self {
        let mut data = self.data;
        match transport {
            TaskTransportType::Direct => data[0] |= Self::DIRECT_CALL_FLAG,
            TaskTransportType::Nodelet => data[0] &= !Self::DIRECT_CALL_FLAG,
        }
        Self { data }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
