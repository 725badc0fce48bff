// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session state shared by the request engine and the authenticator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ParseError;
use crate::protocol;

/// Account credentials.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Account username (e-mail address).
    #[serde(rename = "Username")]
    pub username: String,
    /// Account password.
    #[serde(rename = "Password")]
    pub password: String,
}

impl Credentials {
    /// Creates a credentials record.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque session token issued by the login call.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityToken(String);

impl SecurityToken {
    /// Wraps a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as sent in the `SecurityToken` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurityToken(<redacted>)")
    }
}

/// Account information returned after authentication.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo(Value);

impl AccountInfo {
    /// Wraps the raw account payload.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Returns the account identifier (`Account.Id`).
    ///
    /// # Errors
    ///
    /// Returns `ParseError::MissingField` if the payload has no string or
    /// numeric identifier.
    pub fn account_id(&self) -> Result<String, ParseError> {
        self.0
            .pointer("/Account/Id")
            .and_then(protocol::identifier)
            .ok_or_else(|| ParseError::MissingField("Account.Id".to_string()))
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.0
    }
}

/// Mutable session context of one client.
///
/// Always accessed through a short-lived lock that is never held across an
/// `.await`.
#[derive(Debug, Default)]
pub(crate) struct Session {
    credentials: Option<Credentials>,
    token: Option<SecurityToken>,
    account: Option<AccountInfo>,
    last_refresh: Option<Instant>,
    last_refreshed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub(crate) fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    /// Drops the whole credentials record.
    pub(crate) fn clear_credentials(&mut self) {
        self.credentials = None;
    }

    pub(crate) fn token(&self) -> Option<&SecurityToken> {
        self.token.as_ref()
    }

    pub(crate) fn set_token(&mut self, token: Option<SecurityToken>) {
        self.token = token;
    }

    pub(crate) fn account(&self) -> Option<&AccountInfo> {
        self.account.as_ref()
    }

    pub(crate) fn set_account(&mut self, account: AccountInfo) {
        self.account = Some(account);
    }

    pub(crate) fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    pub(crate) fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed_at
    }

    pub(crate) fn record_refresh(&mut self) {
        self.last_refresh = Some(Instant::now());
        self.last_refreshed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn credentials_login_body() {
        let creds = Credentials::new("user@example.com", "hunter2");
        assert_eq!(
            serde_json::to_value(&creds).unwrap(),
            json!({ "Username": "user@example.com", "Password": "hunter2" })
        );
    }

    #[test]
    fn token_debug_redacted() {
        let token = SecurityToken::new("secret-token");
        assert!(!format!("{token:?}").contains("secret-token"));
        assert_eq!(token.as_str(), "secret-token");
    }

    #[test]
    fn account_id_present() {
        let info = AccountInfo::new(json!({ "Account": { "Id": "abc-123" } }));
        assert_eq!(info.account_id().unwrap(), "abc-123");
    }

    #[test]
    fn numeric_account_id() {
        let info = AccountInfo::new(json!({ "Account": { "Id": 77 } }));
        assert_eq!(info.account_id().unwrap(), "77");
    }

    #[test]
    fn account_id_missing() {
        let info = AccountInfo::new(json!({ "UserId": 7 }));
        assert!(matches!(
            info.account_id(),
            Err(ParseError::MissingField(field)) if field == "Account.Id"
        ));
    }

    #[test]
    fn clearing_credentials_drops_whole_record() {
        let mut session = Session::default();
        session.set_credentials(Credentials::new("u", "p"));
        session.clear_credentials();
        assert!(session.credentials().is_none());
    }
}
