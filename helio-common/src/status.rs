// Copyright 2025 The Helio Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Wire-level status codes and the common error type.
//!
//! The success case is carried by `Result`, so there is no `OK` variant;
//! the numeric values of the remaining codes are protocol-stable.

use std::fmt;

/// Status codes shared across process boundaries. The discriminant values
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum StatusCode {
    OutOfMemory = 1,
    KeyError = 2,
    TypeError = 3,
    Invalid = 4,
    IOError = 5,
    UnknownError = 9,
    NotImplemented = 10,
    TimedOut = 12,
    Interrupted = 13,
    NotFound = 17,
    Disconnected = 18,
    AlreadyExists = 20,
    ObjectExists = 21,
    ObjectNotFound = 22,
    ObjectStoreFull = 24,
    RpcError = 30,
    InvalidArgument = 34,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OutOfMemory",
            Self::KeyError => "KeyError",
            Self::TypeError => "TypeError",
            Self::Invalid => "Invalid",
            Self::IOError => "IOError",
            Self::UnknownError => "UnknownError",
            Self::NotImplemented => "NotImplemented",
            Self::TimedOut => "TimedOut",
            Self::Interrupted => "Interrupted",
            Self::NotFound => "NotFound",
            Self::Disconnected => "Disconnected",
            Self::AlreadyExists => "AlreadyExists",
            Self::ObjectExists => "ObjectExists",
            Self::ObjectNotFound => "ObjectNotFound",
            Self::ObjectStoreFull => "ObjectStoreFull",
            Self::RpcError => "RpcError",
            Self::InvalidArgument => "InvalidArgument",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary error type for cross-component Helio operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct HelioError {
    pub code: StatusCode,
    pub message: String,
    /// For RpcError, the transport status code.
    pub rpc_code: Option<i32>,
}

impl HelioError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            rpc_code: None,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Invalid, msg)
    }
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::IOError, msg)
    }
    pub fn timed_out(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::TimedOut, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, msg)
    }
    pub fn object_exists(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::ObjectExists, msg)
    }
    pub fn object_not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::ObjectNotFound, msg)
    }
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, msg)
    }
    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Disconnected, msg)
    }

    pub fn rpc_error(msg: impl Into<String>, rpc_code: i32) -> Self {
        Self {
            code: StatusCode::RpcError,
            message: msg.into(),
            rpc_code: Some(rpc_code),
        }
    }

    pub fn is_timed_out(&self) -> bool {
        self.code == StatusCode::TimedOut
    }
    pub fn is_object_exists(&self) -> bool {
        self.code == StatusCode::ObjectExists
    }
    pub fn is_not_found(&self) -> bool {
        self.code == StatusCode::NotFound
    }
    pub fn is_rpc_error(&self) -> bool {
        self.code == StatusCode::RpcError
    }
}

/// Convenience alias, the Rust rendering of a `Status`-returning API.
pub type HelioResult<T> = Result<T, HelioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HelioError::io_error("disk full");
        assert_eq!(err.to_string(), "IOError: disk full");
    }

    #[test]
    fn test_predicates() {
        assert!(HelioError::object_exists("dup").is_object_exists());
        assert!(HelioError::timed_out("t").is_timed_out());

        let err = HelioError::rpc_error("connection refused", 14);
        assert!(err.is_rpc_error());
        assert_eq!(err.rpc_code, Some(14));
    }
}
