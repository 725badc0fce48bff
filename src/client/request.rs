// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serialized, retrying request engine.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::{CallPath, Client};
use crate::error::{Error, ProtocolError, RequestError, Result};
use crate::protocol::{self, ApiRequest, ApiResponse, Method, Transport};
use crate::session::Credentials;

/// Description of one API call.
///
/// # Examples
///
/// ```
/// use myq_lib::ApiCall;
/// use serde_json::json;
///
/// let call = ApiCall::get("My").with_query("expand", "account");
/// let put = ApiCall::put("Accounts/abc/Devices/CG01/actions")
///     .with_api_version("5.1")
///     .with_json(json!({ "action_type": "close" }));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    method: Method,
    endpoint: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    login: bool,
    api_version: Option<String>,
}

impl ApiCall {
    /// Creates a call with the given method and endpoint path.
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            login: false,
            api_version: None,
        }
    }

    /// Creates a `GET` call.
    #[must_use]
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    /// Creates a `POST` call.
    #[must_use]
    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    /// Creates a `PUT` call.
    #[must_use]
    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Put, endpoint)
    }

    /// Adds an extra header. Service identification headers cannot be
    /// overridden this way.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a query string parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the API version of this call.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Marks the call as the login call: no token is sent and a 401 means
    /// the credentials are wrong.
    #[must_use]
    pub(crate) fn login(mut self) -> Self {
        self.login = true;
        self
    }

    /// Returns the endpoint path.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }
}

/// Why one attempt did not produce a usable body.
enum Failure {
    Transport(ProtocolError),
    Status(ApiResponse),
}

impl Failure {
    fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(response) if response.is_unauthorized())
    }

    /// Service-provided description, falling back to the raw error text.
    fn description(&self) -> String {
        match self {
            Self::Status(response) => response
                .description()
                .map_or_else(|| self.to_string(), str::to_string),
            Self::Transport(_) => self.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{err}"),
            Self::Status(response) => write!(f, "HTTP status {}", response.status),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Issues an API call and returns the decoded response body.
    ///
    /// Calls are serialized: while one call (including its retries and
    /// backoff pauses) is running, others wait their turn. Transient
    /// failures are retried according to the configured
    /// [`RetryPolicy`](crate::RetryPolicy). When the service rejects the
    /// security token, the client logs in again with the stored credentials
    /// and retries the call with the new token.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCredentials` if a login call is rejected
    /// - `Error::Request` if all attempts fail or re-authentication fails
    pub async fn request(&self, call: ApiCall) -> Result<Value> {
        self.call(&call, CallPath::Public).await
    }

    pub(crate) async fn call(&self, call: &ApiCall, path: CallPath) -> Result<Value> {
        match path {
            CallPath::Public => {
                let _guard = self.inner.request_lock.lock().await;
                self.attempt_loop(call, path).await
            }
            // The outer call already holds the request lock.
            CallPath::Reauthentication => self.attempt_loop(call, path).await,
        }
    }

    async fn attempt_loop(&self, call: &ApiCall, path: CallPath) -> Result<Value> {
        let config = &self.inner.config;
        let retry = config.retry_policy();
        let version = call
            .api_version
            .as_deref()
            .unwrap_or_else(|| config.api_version());
        let url = config.endpoint_url(version, &call.endpoint);

        let mut attempt: u32 = 0;
        loop {
            tracing::debug!(method = %call.method, url = %url, attempt, "Sending API request");

            let failure = match self.inner.transport.send(self.build_request(call, &url)).await {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) => Failure::Status(response),
                Err(err) => Failure::Transport(err),
            };

            tracing::debug!(url = %url, attempt, error = %failure, "API request attempt failed");

            if failure.is_unauthorized() {
                if call.login {
                    self.inner.session.lock().clear_credentials();
                    tracing::error!(url = %url, "Login rejected, clearing credentials");
                    return Err(Error::InvalidCredentials);
                }

                if path == CallPath::Reauthentication {
                    return Err(RequestError::TokenRejected {
                        endpoint: call.endpoint.clone(),
                    }
                    .into());
                }

                tracing::debug!(url = %url, "Security token has expired, re-authenticating");
                let credentials = self.inner.session.lock().credentials().cloned();
                if let Err(err) = self.reauthenticate_locked(credentials).await {
                    let err = RequestError::Reauthentication {
                        endpoint: call.endpoint.clone(),
                        reason: err.to_string(),
                    };
                    tracing::error!(error = %err, "Re-authentication failed");
                    return Err(err.into());
                }
            }

            if attempt + 1 >= retry.max_attempts() {
                let err = RequestError::RetriesExhausted {
                    endpoint: call.endpoint.clone(),
                    attempts: attempt + 1,
                    description: failure.description(),
                };
                tracing::error!(url = %url, error = %err, "API request failed");
                return Err(err.into());
            }

            let wait = retry.delay_for(attempt);
            tracing::warn!(
                url = %url,
                attempt,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "API request failed, retrying"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// Logs in again while the request lock is held by the caller.
    ///
    /// Boxed because it re-enters the engine through the authenticator.
    fn reauthenticate_locked(
        &self,
        credentials: Option<Credentials>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.authenticate_with(credentials, CallPath::Reauthentication))
    }

    fn build_request(&self, call: &ApiCall, url: &str) -> ApiRequest {
        let mut headers = call.headers.clone();
        if !call.login
            && let Some(token) = self.inner.session.lock().token()
        {
            headers.push((
                protocol::SECURITY_TOKEN_HEADER.to_string(),
                token.as_str().to_string(),
            ));
        }
        for (name, value) in protocol::service_headers() {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.to_string(), value.to_string()));
        }

        ApiRequest {
            method: call.method,
            url: url.to_string(),
            headers,
            query: call.query.clone(),
            body: call.body.clone(),
        }
    }
}
