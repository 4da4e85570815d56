// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Backend chaining continuations on a native async client.
//!
//! `send` returns as soon as the call is initiated. The status code and the
//! body are collected by two chained continuations running on the tokio
//! runtime, and the completion fires from there: callers must not assume it
//! runs on their own thread.

pub mod reqwest_client;

use super::{Lifecycle, TransportBackend};
use crate::completion::Completion;
use crate::config::{BackendKind, TransportConfig};
use crate::error::{InitError, TransportError};
use crate::header::HeaderFieldSet;
use crate::{HttpMethod, Request, Response};
use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, warn};

/// Content type of every submitted body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Future resolving to the native response once its status line arrived.
pub type ResponseFuture<R> = Pin<Box<dyn Future<Output = Result<R, TransportError>> + Send>>;

/// Future resolving to the next body chunk, or `None` once the body is complete.
pub type ChunkFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Bytes>, TransportError>> + Send + 'a>>;

/// Factory for the native async client.
pub trait TaskStack: Send + Sync + 'static {
    /// The client shared by every call of one backend instance.
    type Client: TaskClient;

    /// Create the client identified by `user_agent`.
    fn open_client(&self, user_agent: &str) -> Result<Self::Client, InitError>;
}

/// A native HTTP client that only offers chained async primitives.
pub trait TaskClient: Send + Sync + 'static {
    /// The response handle produced by [`TaskClient::post`].
    type Response: TaskResponse;

    /// Initiate a POST of `body` to `url`.
    ///
    /// An error returned here means the call could not be issued at all.
    fn post(
        &self,
        url: &str,
        headers: &HeaderFieldSet,
        body: String,
        content_type: &str,
    ) -> Result<ResponseFuture<Self::Response>, TransportError>;
}

/// A native response whose body has not been read yet.
///
/// The body is pulled chunk by chunk so the backend can stop reading once
/// the configured limit is exceeded.
pub trait TaskResponse: Send + 'static {
    /// The numeric status code.
    fn status_code(&self) -> Result<u16, TransportError>;

    /// The body length announced by the peer, if any.
    fn content_length(&self) -> Option<u64>;

    /// Pull the next body chunk.
    fn next_chunk(&mut self) -> ChunkFuture<'_>;
}

#[derive(Debug)]
enum RuntimeSlot {
    Owned(Runtime),
    Shared(Handle),
}

impl RuntimeSlot {
    fn handle(&self) -> &Handle {
        match self {
            Self::Owned(runtime) => runtime.handle(),
            Self::Shared(handle) => handle,
        }
    }
}

struct TaskSession<C> {
    client: Arc<C>,
    runtime: RuntimeSlot,
}

/// A [`TransportBackend`] over a [`TaskStack`].
///
/// `init` reuses the tokio runtime it is called from, if any, and otherwise
/// starts a dedicated multi-thread runtime that `shutdown` stops.
pub struct TaskChainedBackend<S: TaskStack> {
    stack: S,
    state: Lifecycle<TaskSession<S::Client>>,
    user_agent: String,
    max_response_body: Option<usize>,
}

impl<S: TaskStack> TaskChainedBackend<S> {
    /// Create an uninitialized backend over `stack`.
    pub fn new(stack: S, config: &TransportConfig) -> Self {
        Self {
            stack,
            state: Lifecycle::Uninitialized,
            user_agent: config.user_agent().to_owned(),
            max_response_body: config.max_response_body(),
        }
    }

    fn open(&self) -> Result<TaskSession<S::Client>, InitError> {
        let client = self.stack.open_client(&self.user_agent)?;
        let runtime = match Handle::try_current() {
            Ok(handle) => RuntimeSlot::Shared(handle),
            Err(_) => RuntimeSlot::Owned(
                tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .thread_name("dd-http-transport")
                    .enable_all()
                    .build()
                    .map_err(|e| InitError::Runtime(e.to_string()))?,
            ),
        };
        Ok(TaskSession {
            client: Arc::new(client),
            runtime,
        })
    }
}

/// Status and body continuations, run on the runtime.
async fn complete_call<R: TaskResponse>(
    pending: ResponseFuture<R>,
    max_response_body: Option<usize>,
) -> Result<Response, TransportError> {
    let mut response = pending.await?;
    let status_code = response.status_code()?;
    let text = read_text(&mut response, max_response_body).await?;
    debug!(
        http.status = status_code,
        http.body_len = text.len(),
        "Response received"
    );
    Ok(Response::new(status_code, text.into_bytes()))
}

/// Read the whole body as UTF-8 text, failing as soon as it exceeds `limit`.
async fn read_text<R: TaskResponse>(
    response: &mut R,
    limit: Option<usize>,
) -> Result<String, TransportError> {
    if let Some(limit) = limit {
        let announced = response.content_length();
        if announced.is_some_and(|len| usize::try_from(len).map_or(true, |len| len > limit)) {
            return Err(TransportError::BodyTooLarge { limit });
        }
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.next_chunk().await? {
        if let Some(limit) = limit {
            if body.len() + chunk.len() > limit {
                return Err(TransportError::BodyTooLarge { limit });
            }
        }
        body.extend_from_slice(&chunk);
    }
    String::from_utf8(body).map_err(|e| TransportError::ProtocolDecode(e.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

impl<S: TaskStack> TransportBackend for TaskChainedBackend<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::TaskChained
    }

    fn init(&mut self) -> Result<(), InitError> {
        self.state.check_init()?;
        let opened = self.open();
        match &opened {
            Ok(_) => debug!(user_agent = %self.user_agent, "Native client opened"),
            Err(e) => warn!(error = %e, "Failed to open native client"),
        }
        self.state.settle(opened)
    }

    fn shutdown(&mut self) {
        match self.state.shut_down() {
            Some(TaskSession { client, runtime }) => {
                drop(client);
                if let RuntimeSlot::Owned(runtime) = runtime {
                    // In-flight calls are dropped; their completions fire with an error.
                    runtime.shutdown_background();
                }
                debug!("Native client closed");
            }
            None => debug!("Task-chained backend already shut down"),
        }
    }

    fn send(&self, request: Request, completion: Completion) -> Result<(), TransportError> {
        let completion = completion.for_backend(BackendKind::TaskChained.as_str());
        let session = match self.state.session() {
            Ok(session) => session,
            Err(err) => {
                completion.fail(err.clone());
                return Err(err);
            }
        };

        if request.method() != HttpMethod::Post {
            debug!(
                http.method = %request.method(),
                "Task-chained backend always submits a POST"
            );
        }

        let url = request.url();
        if request.headers().contains("content-type") {
            debug!(
                http.content_type = JSON_CONTENT_TYPE,
                "Caller Content-Type replaced"
            );
        }
        let headers: HeaderFieldSet = request
            .headers()
            .iter()
            .filter(|field| !field.name().eq_ignore_ascii_case("content-type"))
            .cloned()
            .collect();
        let issued = panic::catch_unwind(AssertUnwindSafe(|| {
            session.client.post(
                &url,
                &headers,
                request.payload().to_owned(),
                JSON_CONTENT_TYPE,
            )
        }));
        let pending = match issued {
            Ok(Ok(pending)) => pending,
            Ok(Err(err)) => {
                completion.fail(err.clone());
                return Err(err);
            }
            Err(payload) => {
                let err = TransportError::UnexpectedException(panic_message(payload.as_ref()));
                completion.fail(err.clone());
                return Err(err);
            }
        };

        debug!(http.url = %url, "Request initiated");
        let max_response_body = self.max_response_body;
        session.runtime.handle().spawn(async move {
            match complete_call(pending, max_response_body).await {
                Ok(response) => completion.succeed(response),
                Err(err) => completion.fail(err),
            }
        });
        Ok(())
    }
}

impl<S: TaskStack> fmt::Debug for TaskChainedBackend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskChainedBackend")
            .field("user_agent", &self.user_agent)
            .field("max_response_body", &self.max_response_body)
            .field("ready", &self.state.session().is_ok())
            .finish_non_exhaustive()
    }
}
