// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Throttled device list refresh.

use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use super::request::ApiCall;
use super::{CallPath, Client};
use crate::device::MergeSummary;
use crate::error::Result;
use crate::protocol::{self, Transport};

/// What a call to [`Client::refresh_devices`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The previous refresh is too recent; nothing was fetched.
    Throttled,
    /// The service reported no devices; the registry is unchanged.
    NoDevices,
    /// Devices were fetched and merged into the registry.
    Merged(MergeSummary),
}

#[derive(Debug, Default, Deserialize)]
struct AccountsPage {
    #[serde(rename = "Items", default)]
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct DevicesPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Account identifiers are strings on current API versions, numbers on old ones.
fn account_id_of(account: &Value) -> Option<String> {
    protocol::identifier(account.get("Id")?)
}

impl<T: Transport> Client<T> {
    /// Fetches the current device list and merges it into the registry.
    ///
    /// Calls made within the configured refresh interval of the last
    /// completed refresh return [`RefreshOutcome::Throttled`] without any
    /// network traffic. Concurrent callers are not coalesced: whoever comes
    /// second inside the window simply gets the no-op.
    ///
    /// Devices are only ever added or updated; a device that disappears from
    /// the service stays in the registry.
    ///
    /// # Errors
    ///
    /// Returns error if a call fails, or `Error::NotAuthenticated` if the
    /// fallback lookup needs account info that is not available.
    pub async fn refresh_devices(&self) -> Result<RefreshOutcome> {
        self.refresh_with(CallPath::Public).await
    }

    pub(crate) async fn refresh_with(&self, path: CallPath) -> Result<RefreshOutcome> {
        let now = Instant::now();
        let last = self.inner.session.lock().last_refresh();
        if let Some(last) = last
            && last
                .checked_add(self.inner.config.refresh_interval())
                .is_some_and(|next| now < next)
        {
            tracing::debug!("Ignoring device refresh within throttle window");
            return Ok(RefreshOutcome::Throttled);
        }

        tracing::debug!("Retrieving accounts");
        let accounts = self.call(&ApiCall::get("Accounts"), path).await?;
        let accounts: AccountsPage = serde_json::from_value(accounts).unwrap_or_default();

        let mut payloads = Vec::new();
        for account in &accounts.items {
            let Some(account_id) = account_id_of(account) else {
                tracing::debug!("Skipping account without identifier");
                continue;
            };
            payloads.extend(self.fetch_devices(&account_id, path).await?);
        }

        if payloads.is_empty() {
            let account_id = self.account_id()?;
            tracing::debug!(account_id = %account_id, "No devices via account list, using own account");
            payloads = self.fetch_devices(&account_id, path).await?;
        }

        if payloads.is_empty() {
            tracing::debug!("Response did not contain any devices, no updates");
            return Ok(RefreshOutcome::NoDevices);
        }

        let summary = self.inner.devices.merge(payloads);
        self.inner.session.lock().record_refresh();

        tracing::debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            skipped = summary.skipped,
            "Device refresh complete"
        );
        Ok(RefreshOutcome::Merged(summary))
    }

    async fn fetch_devices(&self, account_id: &str, path: CallPath) -> Result<Vec<Value>> {
        tracing::debug!(account_id = %account_id, "Retrieving devices for account");
        let endpoint = format!("Accounts/{}/Devices", urlencoding::encode(account_id));
        let call = ApiCall::get(endpoint).with_api_version(self.inner.config.devices_api_version());
        let body = self.call(&call, path).await?;
        let page: DevicesPage = serde_json::from_value(body).unwrap_or_default();
        Ok(page.items)
    }
}
