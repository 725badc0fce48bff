// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport backed by `reqwest`.

use std::time::Duration;

use reqwest::Client;

use crate::error::ProtocolError;
use crate::protocol::{ApiRequest, ApiResponse, Method, Transport};

/// HTTPS transport for the cloud service.
///
/// Each call is an independent request on a shared connection pool.
///
/// # Examples
///
/// ```no_run
/// use myq_lib::protocol::HttpTransport;
/// use std::time::Duration;
///
/// # fn example() -> myq_lib::Result<()> {
/// let transport = HttpTransport::new(Duration::from_secs(5))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self, ProtocolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self { client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ProtocolError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| ProtocolError::InvalidAddress(format!("{}: {e}", request.url)))?;

        tracing::debug!(method = %request.method, url = %url, "Sending HTTP request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ProtocolError::Http)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(ProtocolError::Http)?;

        tracing::debug!(status, bytes = text.len(), "Received HTTP response");

        Ok(ApiResponse::from_text(status, &text))
    }
}
