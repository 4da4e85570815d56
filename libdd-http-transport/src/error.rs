// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for `libdd-http-transport`.

use std::fmt;
use thiserror::Error;

/// The native networking primitive that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    /// Opening a connection handle to the target host.
    Connect,
    /// Opening a request handle on a connection.
    OpenRequest,
    /// Submitting the header block and body.
    SendRequest,
    /// Waiting for the response header block.
    ReceiveResponse,
    /// Reading the status code out of the response headers.
    QueryHeaders,
    /// Asking how many body bytes can be read.
    QueryDataAvailable,
    /// Reading body bytes.
    ReadData,
}

impl fmt::Display for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::OpenRequest => "open_request",
            Self::SendRequest => "send_request",
            Self::ReceiveResponse => "receive_response",
            Self::QueryHeaders => "query_headers",
            Self::QueryDataAvailable => "query_data_available",
            Self::ReadData => "read_data",
        })
    }
}

/// Errors raised while acquiring a backend's native session or client.
///
/// Any of these leaves the backend unusable: later sends fail with
/// [`TransportError::NoSession`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InitError {
    /// `init` was already called on this backend.
    #[error("backend already initialized")]
    AlreadyInitialized,

    /// `init` was called after `shutdown`.
    #[error("backend was shut down")]
    ShutDown,

    /// The native session or client could not be created.
    #[error("failed to open native session: {0}")]
    Session(String),

    /// No usable TLS root certificate was found.
    #[error("no valid root certificates found: {0}")]
    RootCertificates(String),

    /// The async runtime driving the backend could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(String),

    /// The selected backend was not compiled into this build.
    #[error("backend `{0}` is not available in this build")]
    BackendUnavailable(&'static str),
}

/// Errors produced by a send operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// `send` was called on a backend without a successfully opened session.
    #[error("no native session available")]
    NoSession,

    /// `send` was called after the backend was shut down.
    #[error("backend was shut down")]
    ShutDown,

    /// A native networking primitive reported a failure.
    #[error("native call {op} failed with code {code}: {message}")]
    NativeCall {
        /// Which primitive failed.
        op: NativeOp,
        /// The code reported by the native stack.
        code: i32,
        /// Human readable description of the failure.
        message: String,
    },

    /// The native async client rejected or failed the call.
    #[error("native client error: {0}")]
    NativeClient(String),

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    ProtocolDecode(String),

    /// Any other failure surfacing through the async chain, panics included.
    #[error("unexpected exception: {0}")]
    UnexpectedException(String),

    /// The response body exceeded the configured limit.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge {
        /// The configured limit in bytes.
        limit: usize,
    },

    /// The backend failed to initialize.
    #[error(transparent)]
    Init(#[from] InitError),
}

impl TransportError {
    /// Map a native I/O error raised by `op` into a [`TransportError::NativeCall`].
    pub fn native(op: NativeOp, err: &std::io::Error) -> Self {
        Self::NativeCall {
            op,
            code: err.raw_os_error().unwrap_or(-1),
            message: err.to_string(),
        }
    }

    /// The integer status reported for this error by the synchronous `send` return.
    ///
    /// Native call failures carry the native code as-is. Every other failure
    /// is negative. `NoSession` and `NativeClient` share `-1`, the generic
    /// failure code; all remaining categories have a value of their own.
    pub fn code(&self) -> i32 {
        match self {
            Self::NativeCall { code, .. } => *code,
            Self::NoSession | Self::NativeClient(_) => -1,
            Self::UnexpectedException(_) => -2,
            Self::ProtocolDecode(_) => -3,
            Self::BodyTooLarge { .. } => -4,
            Self::ShutDown => -5,
            Self::Init(_) => -6,
        }
    }
}

/// Errors raised while reading transport configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The backend name is not one of `blocking`, `task-chained`, `mock`.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    /// The response body limit is not a valid byte count.
    #[error("invalid response body limit: {0}")]
    InvalidBodyLimit(String),
}
