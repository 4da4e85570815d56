// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Handle model of a blocking native HTTP stack.

use crate::error::InitError;
use crate::HttpMethod;
use std::io;

/// A blocking HTTP stack exposing session, connection and request handles.
///
/// Every call blocks the calling thread until the native primitive returns.
/// Handles are released by dropping them. The backend keeps the per-call
/// connection and request handles on its own stack frame, so they are
/// released on every exit path in reverse acquisition order: request first,
/// then connection.
pub trait BlockingStack: Send + Sync + 'static {
    /// Process-wide session, shared by concurrent calls.
    type Session: Send + Sync;
    /// Per-call connection handle to one host.
    type Connection;
    /// Per-call request handle opened on a connection.
    type Request;

    /// Open the session identified by `user_agent`.
    fn open_session(&self, user_agent: &str) -> Result<Self::Session, InitError>;

    /// Open a connection handle to `hostname` on `port`.
    fn connect(
        &self,
        session: &Self::Session,
        hostname: &str,
        port: u16,
    ) -> io::Result<Self::Connection>;

    /// Open a TLS request handle for `method` and `path`.
    fn open_request(
        &self,
        connection: &mut Self::Connection,
        method: HttpMethod,
        path: &str,
    ) -> io::Result<Self::Request>;

    /// Submit the rendered header block and the body in one call.
    fn send_request(&self, request: &mut Self::Request, headers: &str, body: &[u8])
        -> io::Result<()>;

    /// Wait until the response header block has been received.
    fn receive_response(&self, request: &mut Self::Request) -> io::Result<()>;

    /// The numeric status code of the received response.
    fn query_status_code(&self, request: &mut Self::Request) -> io::Result<u16>;

    /// Number of body bytes that can be read without blocking on the peer.
    /// Zero means the body is complete.
    fn query_data_available(&self, request: &mut Self::Request) -> io::Result<usize>;

    /// Read body bytes into `buf`, returning how many were written.
    fn read_data(&self, request: &mut Self::Request, buf: &mut [u8]) -> io::Result<usize>;
}
