// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Outbound request value.

use crate::header::{HeaderField, HeaderFieldSet};
use std::fmt;

/// The scheme every request is sent with. There is no plaintext mode.
pub const HTTPS_SCHEME: &str = "https://";

/// HTTP methods supported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
}

impl HttpMethod {
    /// The method token as sent on the request line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound HTTPS call.
///
/// Built once with the `with_*` methods and read-only afterwards. The payload
/// is UTF-8 text and is buffered in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: HttpMethod,
    hostname: String,
    path: String,
    payload: String,
    headers: HeaderFieldSet,
}

impl Request {
    /// Create a request with an empty payload and no headers.
    pub fn new(method: HttpMethod, hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            hostname: hostname.into(),
            path: path.into(),
            payload: String::new(),
            headers: HeaderFieldSet::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(hostname: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, hostname, path)
    }

    /// Shorthand for a POST request carrying `payload`.
    pub fn post(
        hostname: impl Into<String>,
        path: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(HttpMethod::Post, hostname, path).with_payload(payload)
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Append a header field.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderField::new(name, value));
        self
    }

    /// Replace the whole header set.
    pub fn with_headers(mut self, headers: HeaderFieldSet) -> Self {
        self.headers = headers;
        self
    }

    /// The request method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Target host name, without scheme or port.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Request path, including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The payload text.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The header fields, in insertion order.
    pub fn headers(&self) -> &HeaderFieldSet {
        &self.headers
    }

    /// The absolute URL: `https://` followed by the hostname and the path.
    pub fn url(&self) -> String {
        let mut url =
            String::with_capacity(HTTPS_SCHEME.len() + self.hostname.len() + self.path.len());
        url.push_str(HTTPS_SCHEME);
        url.push_str(&self.hostname);
        url.push_str(&self.path);
        url
    }
}
