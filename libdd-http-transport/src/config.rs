// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Configuration types for `libdd-http-transport`.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the backend (`blocking`, `task-chained`, `mock`).
pub const ENV_BACKEND: &str = "DD_HTTP_TRANSPORT_BACKEND";

/// Environment variable overriding the response body limit, in bytes.
/// `0` disables the limit.
pub const ENV_MAX_RESPONSE_BODY: &str = "DD_HTTP_TRANSPORT_MAX_RESPONSE_BODY";

/// Response body limit applied unless configured otherwise.
pub const DEFAULT_MAX_RESPONSE_BODY: usize = 32 * 1024 * 1024;

/// The user agent identifying the native session.
pub const DEFAULT_USER_AGENT: &str = concat!("libdd-http-transport/", env!("CARGO_PKG_VERSION"));

/// Which transport backend a dispatcher drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Blocking native stack; completion runs inline on the calling thread.
    #[default]
    Blocking,
    /// Task-chained async client; completion runs on the runtime's threads.
    TaskChained,
    /// In-memory backend recording calls, for tests.
    Mock,
}

impl BackendKind {
    /// The name used in configuration and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::TaskChained => "task-chained",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" => Ok(Self::Blocking),
            "task-chained" | "task_chained" => Ok(Self::TaskChained),
            "mock" => Ok(Self::Mock),
            _ => Err(ConfigError::UnknownBackend(s.to_owned())),
        }
    }
}

/// Configuration for a [`crate::RequestDispatcher`] and its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    backend: BackendKind,
    user_agent: String,
    max_response_body: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_response_body: Some(DEFAULT_MAX_RESPONSE_BODY),
        }
    }
}

impl TransportConfig {
    /// Returns a builder starting from the defaults.
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::new()
    }

    /// Read the configuration from `DD_HTTP_TRANSPORT_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but invalid values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = TransportConfigBuilder::new();
        if let Some(kind) = lookup(ENV_BACKEND).filter(|v| !v.trim().is_empty()) {
            builder = builder.backend(kind.parse()?);
        }
        if let Some(limit) = lookup(ENV_MAX_RESPONSE_BODY).filter(|v| !v.trim().is_empty()) {
            let bytes: usize = limit
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidBodyLimit(limit.clone()))?;
            builder = builder.max_response_body((bytes != 0).then_some(bytes));
        }
        Ok(builder.build())
    }

    /// The selected backend.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// The user agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The response body limit in bytes, if any.
    pub fn max_response_body(&self) -> Option<usize> {
        self.max_response_body
    }
}

/// Builder for [`TransportConfig`].
///
/// Obtain via [`TransportConfig::builder`].
#[derive(Debug)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: TransportConfig::default(),
        }
    }

    /// Select the backend.
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the user agent identifying the native session.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the response body limit. `None` accepts bodies of any size.
    pub fn max_response_body(mut self, limit: Option<usize>) -> Self {
        self.config.max_response_body = limit;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TransportConfig {
        self.config
    }
}
