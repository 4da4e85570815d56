// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Exactly-once delivery of a send outcome.

use crate::{Response, TransportError};
use std::fmt;
use tracing::error;

/// Outcome of one send operation, as handed to a [`Completion`].
pub type Outcome = Result<Response, TransportError>;

type Handler = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// The completion handler of one send operation.
///
/// Consuming methods make a second delivery impossible. If a `Completion` is
/// dropped without having been fired (a backend task panicked, or its runtime
/// was shut down with the call in flight) the handler still runs, once, with
/// [`TransportError::UnexpectedException`].
pub struct Completion {
    handler: Option<Handler>,
    backend: &'static str,
}

impl Completion {
    /// Wrap a handler receiving the raw outcome.
    pub fn new(handler: impl FnOnce(Outcome) + Send + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
            backend: "unknown",
        }
    }

    /// Tag the completion with the backend delivering it, for diagnostics.
    pub(crate) fn for_backend(mut self, backend: &'static str) -> Self {
        self.backend = backend;
        self
    }

    /// Deliver a response.
    pub fn succeed(self, response: Response) {
        self.deliver(Ok(response));
    }

    /// Log the failure as a diagnostic and deliver it.
    pub fn fail(self, err: TransportError) {
        error!(
            transport.backend = self.backend,
            error.code = err.code(),
            error = %err,
            "Exception thrown while sending request"
        );
        self.deliver(Err(err));
    }

    fn deliver(mut self, outcome: Outcome) {
        if let Some(handler) = self.handler.take() {
            handler(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            error!(
                transport.backend = self.backend,
                "Send operation ended without a response"
            );
            handler(Err(TransportError::UnexpectedException(
                "send operation ended without a response".to_owned(),
            )));
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("backend", &self.backend)
            .field("pending", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (Completion, Arc<Mutex<Vec<Outcome>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let completion = Completion::new(move |outcome| sink.lock().unwrap().push(outcome));
        (completion, seen)
    }

    #[test]
    fn succeed_delivers_once() {
        let (completion, seen) = recording();
        completion.succeed(Response::new(200, "ok"));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], Ok(Response::new(200, "ok")));
    }

    #[test]
    fn fail_delivers_error() {
        let (completion, seen) = recording();
        completion.fail(TransportError::NoSession);
        assert_eq!(*seen.lock().unwrap(), vec![Err(TransportError::NoSession)]);
    }

    #[test]
    fn drop_without_delivery_fires_once() {
        let (completion, seen) = recording();
        drop(completion);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            seen[0],
            Err(TransportError::UnexpectedException(_))
        ));
    }

    #[test]
    fn dropped_inside_panicking_task_still_fires() {
        let (completion, seen) = recording();
        let result = std::thread::spawn(move || {
            let _completion = completion;
            panic!("native stack blew up");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
