// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Login sequence.

use serde_json::Value;

use super::request::ApiCall;
use super::{CallPath, Client};
use crate::error::{ParseError, RequestError, Result};
use crate::protocol::Transport;
use crate::session::{AccountInfo, Credentials, SecurityToken};

impl<T: Transport> Client<T> {
    /// Logs in, fetches the account information and the initial device list.
    ///
    /// Every call re-runs the whole sequence. After a failure the client must
    /// be treated as unauthenticated, whatever state was stored on the way.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCredentials` if the service rejects the credentials
    /// - `Error::Request` if the login response has no token or a call fails
    pub async fn authenticate(&self, credentials: Credentials) -> Result<()> {
        self.authenticate_with(Some(credentials), CallPath::Public)
            .await
    }

    /// Runs the login sequence again with the stored credentials.
    ///
    /// Does nothing when no credentials are stored, e.g. after the service
    /// rejected them.
    ///
    /// # Errors
    ///
    /// Same as [`authenticate`](Self::authenticate).
    pub async fn reauthenticate(&self) -> Result<()> {
        let credentials = self.inner.session.lock().credentials().cloned();
        self.authenticate_with(credentials, CallPath::Public).await
    }

    pub(crate) async fn authenticate_with(
        &self,
        credentials: Option<Credentials>,
        path: CallPath,
    ) -> Result<()> {
        let Some(credentials) = credentials else {
            tracing::debug!("No stored credentials, most likely after a failed login; skipping");
            return Ok(());
        };

        let body = serde_json::to_value(&credentials).map_err(ParseError::from)?;
        self.inner.session.lock().set_credentials(credentials);

        tracing::debug!("Sending authentication request");
        let login = ApiCall::post("Login").with_json(body).login();
        let response = self.call(&login, path).await?;

        let token = response
            .get("SecurityToken")
            .and_then(Value::as_str)
            .map(SecurityToken::new);
        let has_token = token.is_some();
        self.inner.session.lock().set_token(token);
        if !has_token {
            return Err(RequestError::MissingSecurityToken.into());
        }

        tracing::debug!("Retrieving account information");
        let account = ApiCall::get("My").with_query("expand", "account");
        let account = self.call(&account, path).await?;
        self.inner.session.lock().set_account(AccountInfo::new(account));

        tracing::debug!("Retrieving initial device list");
        self.refresh_with(path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ClientConfig;
    use crate::error::Error;
    use crate::protocol::Method;
    use crate::protocol::mock::{Reply, ScriptedTransport};

    #[tokio::test(start_paused = true)]
    async fn authenticate_runs_full_sequence() {
        let transport = ScriptedTransport::new();
        transport.script_login("token-1", json!([{ "serial_number": "CG1" }]));
        let client = Client::new(transport.clone(), ClientConfig::default());

        client
            .authenticate(Credentials::new("user", "pass"))
            .await
            .unwrap();

        assert!(client.is_authenticated());
        assert_eq!(client.account_id().unwrap(), "acc-1");
        assert!(client.device("CG1").is_some());

        let urls: Vec<String> = transport
            .requests()
            .into_iter()
            .map(|r| r.request.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://api.myqdevice.com/api/v5/Login",
                "https://api.myqdevice.com/api/v5/My",
                "https://api.myqdevice.com/api/v5/Accounts",
                "https://api.myqdevice.com/api/v5.1/Accounts/acc-1/Devices",
            ]
        );
        let my = &transport.requests()[1].request;
        assert_eq!(my.query, vec![("expand".to_string(), "account".to_string())]);
        assert_eq!(my.header("SecurityToken"), Some("token-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_token_fails() {
        let transport = ScriptedTransport::new();
        transport.push(Method::Post, "/Login", Reply::ok(json!({ "UserId": 1 })));
        let client = Client::new(transport.clone(), ClientConfig::default());

        let err = client
            .authenticate(Credentials::new("user", "pass"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Request(RequestError::MissingSecurityToken)
        ));
        assert!(!client.is_authenticated());
        assert_eq!(transport.count(Method::Get, "/My"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reauthenticate_without_credentials_is_noop() {
        let transport = ScriptedTransport::new();
        let client = Client::new(transport.clone(), ClientConfig::default());

        client.reauthenticate().await.unwrap();

        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reauthenticate_replaces_token() {
        let transport = ScriptedTransport::new();
        transport.script_login("token-1", json!([]));
        let client = Client::new(transport.clone(), ClientConfig::default());
        client
            .authenticate(Credentials::new("user", "pass"))
            .await
            .unwrap();
        transport.push(
            Method::Post,
            "/Login",
            Reply::ok(json!({ "SecurityToken": "token-2" })),
        );

        client.reauthenticate().await.unwrap();

        let token = client.inner.session.lock().token().cloned();
        assert_eq!(token, Some(SecurityToken::new("token-2")));
        let login = transport
            .requests()
            .into_iter()
            .rev()
            .find(|r| r.request.url.ends_with("/Login"))
            .unwrap();
        assert_eq!(
            login.request.body,
            Some(json!({ "Username": "user", "Password": "pass" }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn account_info_failure_propagates() {
        let transport = ScriptedTransport::new();
        transport.push(
            Method::Post,
            "/Login",
            Reply::ok(json!({ "SecurityToken": "token-1" })),
        );
        transport.push(
            Method::Get,
            "/My",
            Reply::json(500, json!({ "description": "Account service down" })),
        );
        let config = ClientConfig::default().with_retry_policy(crate::RetryPolicy::new(
            1,
            std::time::Duration::ZERO,
            std::time::Duration::ZERO,
        ));
        let client = Client::new(transport, config);

        let err = client
            .authenticate(Credentials::new("user", "pass"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Account service down"));
        assert!(!client.is_authenticated());
    }
}
