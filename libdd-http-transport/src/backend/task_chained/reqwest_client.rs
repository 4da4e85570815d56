// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Task-chained native stack backed by [`reqwest`].

use super::{ChunkFuture, ResponseFuture, TaskClient, TaskResponse, TaskStack};
use crate::error::{InitError, TransportError};
use crate::header::HeaderFieldSet;
use tracing::debug;

/// Opens a [`reqwest::Client`] per backend instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestStack;

/// Connection-pooling client shared by every call of one backend.
#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

/// A response whose status line has been received.
#[derive(Debug)]
pub struct ReqwestResponse {
    response: reqwest::Response,
}

impl TaskStack for ReqwestStack {
    type Client = ReqwestClient;

    fn open_client(&self, user_agent: &str) -> Result<ReqwestClient, InitError> {
        // reqwest is built without a provider, so rustls needs a process default.
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("Crypto provider already installed");
        }
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| InitError::Session(e.to_string()))?;
        Ok(ReqwestClient { client })
    }
}

impl TaskClient for ReqwestClient {
    type Response = ReqwestResponse;

    fn post(
        &self,
        url: &str,
        headers: &HeaderFieldSet,
        body: String,
        content_type: &str,
    ) -> Result<ResponseFuture<ReqwestResponse>, TransportError> {
        let mut builder = self.client.post(url);
        for field in headers {
            builder = builder.header(field.name(), field.value());
        }
        let request = builder
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .build()
            .map_err(map_reqwest_error)?;

        let pending = self.client.execute(request);
        Ok(Box::pin(async move {
            let response = pending.await.map_err(map_reqwest_error)?;
            Ok(ReqwestResponse { response })
        }))
    }
}

impl TaskResponse for ReqwestResponse {
    fn status_code(&self) -> Result<u16, TransportError> {
        Ok(self.response.status().as_u16())
    }

    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(async move { self.response.chunk().await.map_err(map_reqwest_error) })
    }
}

/// Map a `reqwest::Error` to our `TransportError` variants.
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_decode() {
        TransportError::ProtocolDecode(e.to_string())
    } else {
        TransportError::NativeClient(e.to_string())
    }
}
