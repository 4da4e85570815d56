// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Backend driving a blocking native stack behind the completion contract.
//!
//! `send` performs the whole round trip on the calling thread and fires the
//! completion inline, before returning.

#[cfg(feature = "blocking-backend")]
pub(crate) mod http1;
pub mod native;
#[cfg(feature = "blocking-backend")]
pub mod tls;

use self::native::BlockingStack;
use super::{Lifecycle, TransportBackend};
use crate::completion::Completion;
use crate::config::{BackendKind, TransportConfig};
use crate::error::{InitError, NativeOp, TransportError};
use crate::{Request, Response};
use std::fmt;
use tracing::{debug, warn};

/// Default HTTPS port. Every connection uses it.
pub const HTTPS_PORT: u16 = 443;

/// A [`TransportBackend`] over a [`BlockingStack`].
pub struct BlockingBackend<S: BlockingStack> {
    stack: S,
    state: Lifecycle<S::Session>,
    user_agent: String,
    max_response_body: Option<usize>,
}

impl<S: BlockingStack> BlockingBackend<S> {
    /// Create an uninitialized backend over `stack`.
    pub fn new(stack: S, config: &TransportConfig) -> Self {
        Self {
            stack,
            state: Lifecycle::Uninitialized,
            user_agent: config.user_agent().to_owned(),
            max_response_body: config.max_response_body(),
        }
    }

    fn round_trip(&self, session: &S::Session, request: &Request) -> Result<Response, TransportError> {
        let stack = &self.stack;
        let mut connection = stack
            .connect(session, request.hostname(), HTTPS_PORT)
            .map_err(|e| TransportError::native(NativeOp::Connect, &e))?;
        // Declared after `connection`, so dropped (released) before it.
        let mut handle = stack
            .open_request(&mut connection, request.method(), request.path())
            .map_err(|e| TransportError::native(NativeOp::OpenRequest, &e))?;

        let headers = request.headers().render();
        stack
            .send_request(&mut handle, &headers, request.payload().as_bytes())
            .map_err(|e| TransportError::native(NativeOp::SendRequest, &e))?;
        stack
            .receive_response(&mut handle)
            .map_err(|e| TransportError::native(NativeOp::ReceiveResponse, &e))?;
        let status_code = stack
            .query_status_code(&mut handle)
            .map_err(|e| TransportError::native(NativeOp::QueryHeaders, &e))?;

        let mut body = Vec::new();
        loop {
            let available = stack
                .query_data_available(&mut handle)
                .map_err(|e| TransportError::native(NativeOp::QueryDataAvailable, &e))?;
            if available == 0 {
                break;
            }
            if let Some(limit) = self.max_response_body {
                if body.len() + available > limit {
                    return Err(TransportError::BodyTooLarge { limit });
                }
            }
            let start = body.len();
            body.resize(start + available, 0);
            let read = stack
                .read_data(&mut handle, &mut body[start..])
                .map_err(|e| TransportError::native(NativeOp::ReadData, &e))?;
            body.truncate(start + read);
        }

        debug!(
            http.host = request.hostname(),
            http.status = status_code,
            http.body_len = body.len(),
            "Response received"
        );
        Ok(Response::new(status_code, body))
    }
}

impl<S: BlockingStack> TransportBackend for BlockingBackend<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Blocking
    }

    fn init(&mut self) -> Result<(), InitError> {
        self.state.check_init()?;
        let opened = self.stack.open_session(&self.user_agent);
        match &opened {
            Ok(_) => debug!(user_agent = %self.user_agent, "Native session opened"),
            Err(e) => warn!(error = %e, "Failed to open native session"),
        }
        self.state.settle(opened)
    }

    fn shutdown(&mut self) {
        match self.state.shut_down() {
            Some(session) => {
                drop(session);
                debug!("Native session closed");
            }
            None => debug!("Blocking backend already shut down"),
        }
    }

    fn send(&self, request: Request, completion: Completion) -> Result<(), TransportError> {
        let completion = completion.for_backend(BackendKind::Blocking.as_str());
        let outcome = self
            .state
            .session()
            .and_then(|session| self.round_trip(session, &request));
        match outcome {
            Ok(response) => {
                completion.succeed(response);
                Ok(())
            }
            Err(err) => {
                completion.fail(err.clone());
                Err(err)
            }
        }
    }
}

impl<S: BlockingStack> fmt::Debug for BlockingBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingBackend")
            .field("user_agent", &self.user_agent)
            .field("max_response_body", &self.max_response_body)
            .field("ready", &self.state.session().is_ok())
            .finish_non_exhaustive()
    }
}
