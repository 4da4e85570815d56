// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The public entry point owning one backend instance.

use crate::backend::{self, TransportBackend};
use crate::completion::{Completion, Outcome};
use crate::config::{BackendKind, TransportConfig};
use crate::error::{InitError, TransportError};
use crate::{Request, Response};
use tracing::debug;

/// Dispatches requests to the backend selected at construction.
///
/// The backend is initialized when the dispatcher is built and shut down
/// when it is dropped, including when initialization failed.
///
/// ```rust,no_run
/// use libdd_http_transport::{Request, RequestDispatcher, TransportConfig};
///
/// let dispatcher = RequestDispatcher::new(TransportConfig::default())?;
/// let request = Request::post("intake.example.com", "/v1/input", "{}")
///     .with_header("DD-API-KEY", "<key>");
/// dispatcher.send(request, |response| {
///     println!("status: {}", response.status_code);
/// })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct RequestDispatcher {
    backend: Box<dyn TransportBackend>,
    config: TransportConfig,
}

impl RequestDispatcher {
    /// Build and initialize the backend selected by `config`.
    pub fn new(config: TransportConfig) -> Result<Self, InitError> {
        let backend = backend::from_config(&config)?;
        Self::with_backend(config, backend)
    }

    /// Take ownership of `backend` and initialize it.
    pub fn with_backend(
        config: TransportConfig,
        backend: Box<dyn TransportBackend>,
    ) -> Result<Self, InitError> {
        let mut dispatcher = Self { backend, config };
        // On failure `dispatcher` is dropped here, which shuts the backend down.
        dispatcher.backend.init()?;
        debug!(
            transport.backend = %dispatcher.backend.kind(),
            "Transport dispatcher created"
        );
        Ok(dispatcher)
    }

    /// Issue `request` and hand the resulting [`Response`] to `on_response`.
    ///
    /// `on_response` runs exactly once. It receives the sentinel response
    /// (status `0`, empty payload) whenever no real response was obtained. The
    /// returned error only reports failures detected before the call was
    /// initiated on the wire.
    pub fn send(
        &self,
        request: Request,
        on_response: impl FnOnce(Response) + Send + 'static,
    ) -> Result<(), TransportError> {
        let completion = Completion::new(move |outcome| on_response(Self::normalize(outcome)));
        self.backend.send(request, completion)
    }

    /// Issue `request` and wait for its outcome.
    ///
    /// The blocking backend performs the round trip before this future is
    /// first polled to completion, holding the executor thread meanwhile.
    pub async fn send_async(&self, request: Request) -> Result<Response, TransportError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let completion = Completion::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        self.backend.send(request, completion)?;
        rx.await.map_err(|_| {
            TransportError::UnexpectedException("completion channel closed".to_owned())
        })?
    }

    /// Map a backend outcome to the uniform response shape.
    ///
    /// Responses pass through unchanged, failures become the sentinel.
    pub fn normalize(outcome: Outcome) -> Response {
        outcome.unwrap_or_default()
    }

    /// The kind of the owned backend.
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The configuration this dispatcher was built with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        self.backend.shutdown();
        debug!(transport.backend = %self.backend.kind(), "Transport dispatcher dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use std::sync::{Arc, Mutex};

    fn mock_config() -> TransportConfig {
        TransportConfig::builder().backend(BackendKind::Mock).build()
    }

    #[test]
    fn normalize_keeps_responses() {
        let response = Response::new(200, "ok");
        assert_eq!(RequestDispatcher::normalize(Ok(response.clone())), response);
    }

    #[test]
    fn normalize_maps_errors_to_sentinel() {
        let normalized = RequestDispatcher::normalize(Err(TransportError::NoSession));
        assert!(normalized.is_sentinel());
        assert!(normalized.payload.is_empty());
    }

    #[test]
    fn send_delivers_normalized_response() {
        let backend = MockBackend::new();
        let handle = backend.handle();
        handle.push_response(200, "ok");
        handle.push_outcome(Err(TransportError::ProtocolDecode("bad".to_owned())));
        let dispatcher = RequestDispatcher::with_backend(mock_config(), Box::new(backend)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..2 {
            let sink = seen.clone();
            dispatcher
                .send(Request::get("example.com", "/status"), move |r| {
                    sink.lock().unwrap().push(r)
                })
                .unwrap();
        }
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Response::new(200, "ok"), Response::default()]
        );
    }

    #[test]
    fn failed_init_still_shuts_down() {
        let backend = MockBackend::new();
        let handle = backend.handle();
        handle.fail_init(InitError::Session("refused".to_owned()));

        let err = RequestDispatcher::with_backend(mock_config(), Box::new(backend)).unwrap_err();
        assert_eq!(err, InitError::Session("refused".to_owned()));
        assert_eq!(handle.init_calls(), 1);
        assert_eq!(handle.shutdown_calls(), 1);
        assert_eq!(handle.send_calls(), 0);
    }

    #[test]
    fn drop_shuts_down_once() {
        let backend = MockBackend::new();
        let handle = backend.handle();
        let dispatcher = RequestDispatcher::with_backend(mock_config(), Box::new(backend)).unwrap();
        assert_eq!(dispatcher.backend_kind(), BackendKind::Mock);
        assert_eq!(handle.shutdown_calls(), 0);
        drop(dispatcher);
        assert_eq!(handle.shutdown_calls(), 1);
    }

    #[tokio::test]
    async fn send_async_returns_outcome() {
        let backend = MockBackend::new();
        let handle = backend.handle();
        handle.push_response(201, "created");
        handle.push_outcome(Err(TransportError::NativeClient("reset".to_owned())));
        let dispatcher = RequestDispatcher::with_backend(mock_config(), Box::new(backend)).unwrap();

        let request = Request::post("example.com", "/ingest", "{}");
        assert_eq!(
            dispatcher.send_async(request.clone()).await,
            Ok(Response::new(201, "created"))
        );
        assert_eq!(
            dispatcher.send_async(request).await,
            Err(TransportError::NativeClient("reset".to_owned()))
        );
    }
}
