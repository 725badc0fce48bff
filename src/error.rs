// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `myq_lib` library.
//!
//! The hierarchy separates terminal authentication failures, failed API
//! calls, transport problems and malformed service responses.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The service rejected the username/password during login.
    ///
    /// Stored credentials are cleared before this error is returned, so the
    /// client will not retry with them.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// An API call could not be completed.
    #[error("request error: {0}")]
    Request(#[from] RequestError),

    /// Error occurred in the transport layer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while interpreting a service response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The operation requires a completed authentication.
    #[error("client is not authenticated")]
    NotAuthenticated,
}

/// Failures of a call issued through the request engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Every allowed attempt failed.
    #[error("error requesting data from {endpoint} after {attempts} attempts: {description}")]
    RetriesExhausted {
        /// The endpoint that was requested.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
        /// Best available description of the last failure.
        description: String,
    },

    /// The security token expired and logging in again failed.
    #[error("error re-authenticating while requesting {endpoint}: {reason}")]
    Reauthentication {
        /// The endpoint whose call triggered re-authentication.
        endpoint: String,
        /// Why re-authentication failed.
        reason: String,
    },

    /// A freshly issued security token was rejected while re-authenticating.
    #[error("security token rejected by {endpoint} during re-authentication")]
    TokenRejected {
        /// The endpoint that rejected the token.
        endpoint: String,
    },

    /// The login response did not carry a security token.
    #[error("authentication response did not contain a security token")]
    MissingSecurityToken,
}

/// Errors raised by a [`Transport`](crate::protocol::Transport).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection to the service failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Errors related to interpreting service responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON decoding failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
