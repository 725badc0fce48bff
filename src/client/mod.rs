// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The session-holding client.
//!
//! A [`Client`] owns one session (credentials, security token, account info)
//! and the device registry. Every outbound call goes through
//! [`Client::request`], which serializes calls, retries transient failures
//! and logs in again when the token expires.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> myq_lib::Result<()> {
//! let client = myq_lib::login("user@example.com", "password").await?;
//!
//! for (serial, device) in client.covers() {
//!     println!("{serial}: {:?} is {:?}", device.name(), device.door_state());
//! }
//!
//! // Later, poll for changes. Calls closer together than the refresh
//! // interval are ignored.
//! client.refresh_devices().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod refresh;
mod request;

pub use refresh::RefreshOutcome;
pub use request::ApiCall;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ClientConfig;
use crate::device::{Device, DeviceRegistry};
use crate::error::{Error, Result};
use crate::protocol::Transport;
use crate::session::{AccountInfo, Session};

#[cfg(feature = "http")]
use crate::protocol::HttpTransport;
#[cfg(feature = "http")]
use crate::session::Credentials;

/// Which lock discipline a call runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallPath {
    /// Acquires the request lock for the whole retry loop.
    Public,
    /// Runs inside a call that already holds the request lock.
    Reauthentication,
}

struct Inner<T> {
    transport: T,
    config: ClientConfig,
    session: parking_lot::Mutex<Session>,
    devices: DeviceRegistry,
    request_lock: tokio::sync::Mutex<()>,
}

/// Handle to an authenticated session with the cloud service.
///
/// Cloning is cheap; clones share the session, the request lock and the
/// device registry.
pub struct Client<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.config.base_url())
            .field("authenticated", &self.is_authenticated())
            .field("devices", &self.inner.devices.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Client<T> {
    /// Creates an unauthenticated client on top of `transport`.
    ///
    /// Call [`authenticate`](Self::authenticate) before issuing other calls.
    #[must_use]
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                session: parking_lot::Mutex::new(Session::default()),
                devices: DeviceRegistry::new(),
                request_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Returns whether a security token and account info are held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let session = self.inner.session.lock();
        session.token().is_some() && session.account().is_some()
    }

    /// Returns the account information fetched during authentication.
    #[must_use]
    pub fn account_info(&self) -> Option<AccountInfo> {
        self.inner.session.lock().account().cloned()
    }

    /// Returns the account identifier.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAuthenticated` before authentication completed and
    /// a parse error if the account info lacks an identifier.
    pub fn account_id(&self) -> Result<String> {
        let session = self.inner.session.lock();
        let account = session.account().ok_or(Error::NotAuthenticated)?;
        Ok(account.account_id()?)
    }

    /// Returns a snapshot of every known device, keyed by serial number.
    #[must_use]
    pub fn devices(&self) -> HashMap<String, Arc<Device>> {
        self.inner.devices.snapshot()
    }

    /// Returns the device with the given serial number.
    #[must_use]
    pub fn device(&self, serial_number: &str) -> Option<Arc<Device>> {
        self.inner.devices.get(serial_number)
    }

    /// Returns the controllable covers, i.e. every device except gateways.
    #[must_use]
    pub fn covers(&self) -> HashMap<String, Arc<Device>> {
        self.inner.devices.covers()
    }

    /// Returns the wall-clock time of the last completed device refresh.
    #[must_use]
    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.session.lock().last_refreshed_at()
    }
}

/// Logs in to the service with the default configuration.
///
/// # Errors
///
/// Returns `Error::InvalidCredentials` if the service rejects the
/// credentials, or `Error::Request` if any step of the login sequence fails.
#[cfg(feature = "http")]
pub async fn login(
    username: impl Into<String>,
    password: impl Into<String>,
) -> Result<Client<HttpTransport>> {
    login_with_config(ClientConfig::default(), username, password).await
}

/// Logs in to the service with a custom configuration.
///
/// # Errors
///
/// Same as [`login`], plus `Error::Protocol` if the HTTP client cannot be
/// created.
#[cfg(feature = "http")]
pub async fn login_with_config(
    config: ClientConfig,
    username: impl Into<String>,
    password: impl Into<String>,
) -> Result<Client<HttpTransport>> {
    let transport = HttpTransport::new(config.timeout())?;
    let client = Client::new(transport, config);
    client
        .authenticate(Credentials::new(username, password))
        .await?;
    Ok(client)
}
