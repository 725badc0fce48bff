// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration.

use std::time::Duration;

/// Retry behavior of the request engine.
///
/// A failed attempt `k` (counting from zero) is followed by a pause of
/// `min(base_delay * 2^k, max_delay)` before the next attempt.
///
/// # Examples
///
/// ```
/// use myq_lib::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_for(0), Duration::from_secs(1));
/// assert_eq!(policy.delay_for(2), Duration::from_secs(4));
/// assert_eq!(policy.delay_for(3), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Default number of attempts per call.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    /// Default delay after the first failed attempt.
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
    /// Default upper bound for a single backoff pause.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

    /// Creates a policy with the given attempt budget and delays.
    ///
    /// An attempt budget of zero is raised to one.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Returns the total number of attempts per call.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay after the first failed attempt.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the upper bound for a single backoff pause.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the pause that follows failed attempt `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_MAX_ATTEMPTS,
            Self::DEFAULT_BASE_DELAY,
            Self::DEFAULT_MAX_DELAY,
        )
    }
}

/// Configuration for a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use myq_lib::{ClientConfig, RetryPolicy};
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_base_url("https://api.example.test")
///     .with_refresh_interval(Duration::from_secs(10))
///     .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(500), Duration::from_secs(2)));
///
/// assert_eq!(config.endpoint_url("5", "My"), "https://api.example.test/api/v5/My");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    api_version: String,
    devices_api_version: String,
    retry: RetryPolicy,
    refresh_interval: Duration,
    timeout: Duration,
}

impl ClientConfig {
    /// Default service root.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.myqdevice.com";
    /// API version used unless a call overrides it.
    pub const DEFAULT_API_VERSION: &'static str = "5";
    /// API version of the device listing endpoints.
    pub const DEFAULT_DEVICES_API_VERSION: &'static str = "5.1";
    /// Minimum interval between two device refreshes.
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
    /// Default per-request HTTP timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration with the service defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            devices_api_version: Self::DEFAULT_DEVICES_API_VERSION.to_string(),
            retry: RetryPolicy::default(),
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the service root, e.g. a mock server address.
    ///
    /// A trailing slash is stripped.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the default API version.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the API version used by the device listing endpoints.
    #[must_use]
    pub fn with_devices_api_version(mut self, version: impl Into<String>) -> Self {
        self.devices_api_version = version.into();
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the minimum interval between device refreshes.
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the HTTP timeout applied to each attempt.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the service root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the default API version.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns the API version of the device listing endpoints.
    #[must_use]
    pub fn devices_api_version(&self) -> &str {
        &self.devices_api_version
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the minimum interval between device refreshes.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Returns the HTTP timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the full URL of `endpoint` for the given API version.
    #[must_use]
    pub fn endpoint_url(&self, version: &str, endpoint: &str) -> String {
        format!(
            "{}/api/v{version}/{}",
            self.base_url,
            endpoint.trim_start_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..5).map(|k| policy.delay_for(k).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn backoff_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(64), Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_raised_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn config_default_values() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url(), "https://api.myqdevice.com");
        assert_eq!(config.api_version(), "5");
        assert_eq!(config.devices_api_version(), "5.1");
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.retry_policy().max_attempts(), 5);
    }

    #[test]
    fn endpoint_url_template() {
        let config = ClientConfig::new();
        assert_eq!(
            config.endpoint_url("5.1", "Accounts/abc/Devices"),
            "https://api.myqdevice.com/api/v5.1/Accounts/abc/Devices"
        );
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let config = ClientConfig::new().with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.endpoint_url("5", "/My"), "http://127.0.0.1:8080/api/v5/My");
    }
}
