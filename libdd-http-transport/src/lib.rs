// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! `libdd-http-transport` sends HTTPS requests through one of several
//! interchangeable native network stacks behind a single completion-based
//! `send` API.
//!
//! The backend is chosen at runtime from [`TransportConfig`]:
//!
//! - [`BackendKind::Blocking`]: a blocking HTTP/1.1 stack over std sockets and
//!   rustls. The round trip runs on the calling thread and the completion
//!   fires before `send` returns.
//! - [`BackendKind::TaskChained`]: a reqwest client driven by a tokio runtime.
//!   `send` returns once the call is initiated and the completion fires from
//!   a runtime worker thread.
//! - [`BackendKind::Mock`]: scripted in-memory responses, for tests.
//!
//! Whatever happens, the completion runs exactly once per `send`. When no real
//! response was obtained it receives the sentinel [`Response`] with status
//! code `0`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use libdd_http_transport::{BackendKind, Request, RequestDispatcher, TransportConfig};
//!
//! let config = TransportConfig::builder()
//!     .backend(BackendKind::TaskChained)
//!     .build();
//! let dispatcher = RequestDispatcher::new(config)?;
//! let request = Request::post("intake.example.com", "/v1/input", "{\"a\":1}");
//! dispatcher.send(request, |response| {
//!     if response.is_sentinel() {
//!         eprintln!("no response");
//!     }
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Environment
//!
//! [`TransportConfig::from_env`] reads `DD_HTTP_TRANSPORT_BACKEND` and
//! `DD_HTTP_TRANSPORT_MAX_RESPONSE_BODY`.

pub mod backend;
pub mod config;

mod completion;
mod dispatcher;
mod error;
mod header;
mod request;
mod response;

pub use backend::TransportBackend;
pub use completion::{Completion, Outcome};
pub use config::{BackendKind, TransportConfig, TransportConfigBuilder};
pub use dispatcher::RequestDispatcher;
pub use error::{ConfigError, InitError, NativeOp, TransportError};
pub use header::{HeaderField, HeaderFieldSet};
pub use request::{HttpMethod, Request, HTTPS_SCHEME};
pub use response::{Response, SENTINEL_STATUS};
