// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory backend for tests.
//!
//! No network access happens. Outcomes are scripted up front through a
//! [`MockHandle`], which also exposes what the backend was asked to do.

use super::{Lifecycle, TransportBackend};
use crate::completion::{Completion, Outcome};
use crate::config::BackendKind;
use crate::error::{InitError, TransportError};
use crate::{Request, Response};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Shared {
    scripted: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<Request>>,
    fail_init: Mutex<Option<InitError>>,
    inits: AtomicUsize,
    sends: AtomicUsize,
    shutdowns: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the recorded state from others.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Backend completing every call inline with a scripted outcome.
///
/// When the script is exhausted, calls succeed with an empty `200` response.
#[derive(Debug, Default)]
pub struct MockBackend {
    shared: Arc<Shared>,
    state: Lifecycle<()>,
}

/// Inspection and scripting handle of a [`MockBackend`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockBackend {
    /// Create an uninitialized mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle sharing this backend's script and records.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: self.shared.clone(),
        }
    }
}

impl MockHandle {
    /// Queue the outcome of the next unscripted call.
    pub fn push_outcome(&self, outcome: Outcome) -> &Self {
        lock(&self.shared.scripted).push_back(outcome);
        self
    }

    /// Queue a response.
    pub fn push_response(&self, status_code: u16, payload: &str) -> &Self {
        self.push_outcome(Ok(Response::new(status_code, payload.to_owned())))
    }

    /// Make the next `init` fail with `err`.
    pub fn fail_init(&self, err: InitError) {
        *lock(&self.shared.fail_init) = Some(err);
    }

    /// Requests that reached the backend, in order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.shared.requests).clone()
    }

    /// Number of `init` calls.
    pub fn init_calls(&self) -> usize {
        self.shared.inits.load(Ordering::SeqCst)
    }

    /// Number of `send` calls that reached a live session.
    pub fn send_calls(&self) -> usize {
        self.shared.sends.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls.
    pub fn shutdown_calls(&self) -> usize {
        self.shared.shutdowns.load(Ordering::SeqCst)
    }
}

impl TransportBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn init(&mut self) -> Result<(), InitError> {
        self.shared.inits.fetch_add(1, Ordering::SeqCst);
        self.state.check_init()?;
        let opened = match lock(&self.shared.fail_init).take() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        self.state.settle(opened)
    }

    fn shutdown(&mut self) {
        self.shared.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.state.shut_down();
    }

    fn send(&self, request: Request, completion: Completion) -> Result<(), TransportError> {
        let completion = completion.for_backend(BackendKind::Mock.as_str());
        if let Err(err) = self.state.session() {
            completion.fail(err.clone());
            return Err(err);
        }
        self.shared.sends.fetch_add(1, Ordering::SeqCst);
        lock(&self.shared.requests).push(request);

        let outcome = lock(&self.shared.scripted)
            .pop_front()
            .unwrap_or_else(|| Ok(Response::new(200, "")));
        match outcome {
            Ok(response) => completion.succeed(response),
            Err(err) => completion.fail(err),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture() -> (Completion, Arc<Mutex<Vec<Outcome>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (
            Completion::new(move |outcome| sink.lock().unwrap().push(outcome)),
            seen,
        )
    }

    #[test]
    fn scripted_outcomes_in_order() {
        let mut backend = MockBackend::new();
        let handle = backend.handle();
        handle
            .push_response(202, "queued")
            .push_outcome(Err(TransportError::NativeClient("reset".to_owned())));
        backend.init().unwrap();

        let (first, seen_first) = capture();
        let (second, seen_second) = capture();
        let (third, seen_third) = capture();
        backend.send(Request::get("a.test", "/1"), first).unwrap();
        backend.send(Request::get("a.test", "/2"), second).unwrap();
        backend.send(Request::get("a.test", "/3"), third).unwrap();

        assert_eq!(
            *seen_first.lock().unwrap(),
            vec![Ok(Response::new(202, "queued"))]
        );
        assert_eq!(
            *seen_second.lock().unwrap(),
            vec![Err(TransportError::NativeClient("reset".to_owned()))]
        );
        assert_eq!(*seen_third.lock().unwrap(), vec![Ok(Response::new(200, ""))]);

        let paths: Vec<String> = handle
            .requests()
            .iter()
            .map(|r| r.path().to_owned())
            .collect();
        assert_eq!(paths, ["/1", "/2", "/3"]);
        assert_eq!(handle.send_calls(), 3);
    }

    #[test]
    fn failed_init_rejects_sends() {
        let mut backend = MockBackend::new();
        let handle = backend.handle();
        handle.fail_init(InitError::Session("no session".to_owned()));
        assert!(backend.init().is_err());

        let (completion, seen) = capture();
        assert_eq!(
            backend.send(Request::get("a.test", "/"), completion),
            Err(TransportError::NoSession)
        );
        assert_eq!(*seen.lock().unwrap(), vec![Err(TransportError::NoSession)]);
        assert_eq!(handle.send_calls(), 0);
    }

    #[test]
    fn lifecycle_counters() {
        let mut backend = MockBackend::new();
        let handle = backend.handle();
        backend.init().unwrap();
        assert_eq!(backend.init(), Err(InitError::AlreadyInitialized));
        backend.shutdown();
        backend.shutdown();
        assert_eq!(handle.init_calls(), 2);
        assert_eq!(handle.shutdown_calls(), 2);
    }
}
