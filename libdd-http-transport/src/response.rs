// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Response value delivered to completion handlers.

use std::borrow::Cow;

/// Status code of a response that was never received.
pub const SENTINEL_STATUS: u16 = 0;

/// The result of one send operation.
///
/// The default value carries [`SENTINEL_STATUS`] and an empty payload. It is
/// what a completion handler receives when the call failed before any status
/// line came back, which keeps it distinguishable from a genuine remote error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code, or [`SENTINEL_STATUS`].
    pub status_code: u16,

    /// Response body bytes.
    pub payload: bytes::Bytes,
}

impl Response {
    /// Create a response from a status code and body.
    pub fn new(status_code: u16, payload: impl Into<bytes::Bytes>) -> Self {
        Self {
            status_code,
            payload: payload.into(),
        }
    }

    /// Returns true if no real response was obtained.
    pub fn is_sentinel(&self) -> bool {
        self.status_code == SENTINEL_STATUS
    }

    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The payload decoded as UTF-8, with invalid sequences replaced.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
