// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport backends and their shared contract.

pub mod blocking;
pub mod mock;
#[cfg(feature = "task-chained-backend")]
pub mod task_chained;

use crate::completion::Completion;
use crate::config::{BackendKind, TransportConfig};
use crate::error::{InitError, TransportError};
use crate::Request;
use std::fmt;
use tracing::warn;

/// A concrete HTTP stack behind the uniform send interface.
///
/// The trait is object safe: the dispatcher holds a `Box<dyn TransportBackend>`
/// chosen at construction time from [`TransportConfig::backend`].
///
/// Lifecycle: `init` once, any number of `send` calls, `shutdown` once. `send`
/// before a successful `init` fails with [`TransportError::NoSession`] without
/// touching the native stack; `send` after `shutdown` fails with
/// [`TransportError::ShutDown`].
pub trait TransportBackend: Send + Sync + fmt::Debug {
    /// The kind of this backend.
    fn kind(&self) -> BackendKind;

    /// Acquire the native session or client. A failure is terminal for this
    /// instance.
    fn init(&mut self) -> Result<(), InitError>;

    /// Release the native session or client. Calling it again is a no-op.
    fn shutdown(&mut self);

    /// Issue one HTTP call.
    ///
    /// `completion` is fired exactly once on every path, including when this
    /// method returns an error. `Ok(())` only means the call was initiated;
    /// when the completion runs depends on the backend.
    fn send(&self, request: Request, completion: Completion) -> Result<(), TransportError>;
}

/// Build the backend selected by `config`, not yet initialized.
pub fn from_config(config: &TransportConfig) -> Result<Box<dyn TransportBackend>, InitError> {
    match config.backend() {
        #[cfg(feature = "blocking-backend")]
        BackendKind::Blocking => Ok(Box::new(blocking::BlockingBackend::new(
            blocking::tls::TlsStack,
            config,
        ))),
        #[cfg(feature = "task-chained-backend")]
        BackendKind::TaskChained => Ok(Box::new(task_chained::TaskChainedBackend::new(
            task_chained::reqwest_client::ReqwestStack,
            config,
        ))),
        BackendKind::Mock => Ok(Box::new(mock::MockBackend::new())),
        #[allow(unreachable_patterns)]
        kind => Err(InitError::BackendUnavailable(kind.as_str())),
    }
}

/// Lifecycle of a backend's native session.
#[derive(Debug)]
pub(crate) enum Lifecycle<S> {
    Uninitialized,
    Ready(S),
    Failed,
    ShutDown,
}

impl<S> Default for Lifecycle<S> {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl<S> Lifecycle<S> {
    /// Fails unless `init` may still run.
    pub(crate) fn check_init(&self) -> Result<(), InitError> {
        let rejected = match self {
            Self::Uninitialized => return Ok(()),
            Self::ShutDown => InitError::ShutDown,
            Self::Ready(_) | Self::Failed => InitError::AlreadyInitialized,
        };
        warn!(error = %rejected, "Rejected backend init");
        Err(rejected)
    }

    /// Record the result of opening the session.
    pub(crate) fn settle(&mut self, opened: Result<S, InitError>) -> Result<(), InitError> {
        match opened {
            Ok(session) => {
                *self = Self::Ready(session);
                Ok(())
            }
            Err(err) => {
                *self = Self::Failed;
                Err(err)
            }
        }
    }

    /// The open session, if sends are allowed.
    pub(crate) fn session(&self) -> Result<&S, TransportError> {
        match self {
            Self::Ready(session) => Ok(session),
            Self::ShutDown => Err(TransportError::ShutDown),
            Self::Uninitialized | Self::Failed => Err(TransportError::NoSession),
        }
    }

    /// Move to the shut down state, returning the session to release.
    /// Returns `None` if there is nothing to release.
    pub(crate) fn shut_down(&mut self) -> Option<S> {
        match std::mem::replace(self, Self::ShutDown) {
            Self::Ready(session) => Some(session),
            _ => None,
        }
    }
}
