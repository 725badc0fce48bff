// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::error::ProtocolError;
use crate::protocol::{ApiRequest, ApiResponse, Method, Transport};

/// Canned outcome of one exchange.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Response(ApiResponse),
    ConnectionFailed(String),
}

impl Reply {
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Self::Response(ApiResponse::new(status, body))
    }

    pub(crate) fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    pub(crate) fn unauthorized() -> Self {
        Self::json(401, json!({}))
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
    last: Option<Reply>,
}

/// A request seen by the transport and the (paused) time it arrived.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub(crate) request: ApiRequest,
    pub(crate) at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<Recorded>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Transport answering from per-route reply queues.
///
/// Replies for a route are consumed in order; once the queue is drained the
/// last served reply repeats, and replies pushed later are served first. Routes
/// match when the method is equal and the URL ends with the route path.
/// Unknown routes answer 404.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Inner>,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes each exchange take `latency` so overlapping calls would be visible.
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        let mut routes = self.inner.routes.lock();
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.path == path)
        {
            route.replies.push_back(reply);
        } else {
            routes.push(Route {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
                last: None,
            });
        }
        self
    }

    /// Scripts a successful login, account lookup and a single-account
    /// device listing.
    pub(crate) fn script_login(&self, token: &str, devices: Value) -> &Self {
        self.push(
            Method::Post,
            "/Login",
            Reply::ok(json!({ "SecurityToken": token })),
        );
        self.push(
            Method::Get,
            "/My",
            Reply::ok(json!({ "Account": { "Id": "acc-1", "Name": "Home" } })),
        );
        self.push(
            Method::Get,
            "/Accounts",
            Reply::ok(json!({ "Items": [{ "Id": "acc-1" }] })),
        );
        self.push(
            Method::Get,
            "/Accounts/acc-1/Devices",
            Reply::ok(json!({ "items": devices })),
        );
        self
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.inner.log.lock().clone()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.inner
            .log
            .lock()
            .iter()
            .filter(|r| r.request.method == method && r.request.url.ends_with(path))
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, request: &ApiRequest) -> Reply {
        let mut routes = self.inner.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && request.url.ends_with(&r.path));
        let Some(route) = route else {
            return Reply::json(404, json!({ "description": "no such route" }));
        };
        if let Some(reply) = route.replies.pop_front() {
            route.last = Some(reply.clone());
            reply
        } else {
            route
                .last
                .clone()
                .unwrap_or_else(|| Reply::json(404, json!({})))
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ProtocolError> {
        let current = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.inner.log.lock().push(Recorded {
            request: request.clone(),
            at: Instant::now(),
        });
        let reply = self.next_reply(&request);

        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Response(response) => Ok(response),
            Reply::ConnectionFailed(message) => Err(ProtocolError::ConnectionFailed(message)),
        }
    }
}
