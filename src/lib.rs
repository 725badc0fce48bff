// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `myq_lib` - A resilient async client core for the `MyQ` device cloud.
//!
//! The library keeps one authenticated session per [`Client`] and funnels
//! every call through a single serialized request engine that:
//!
//! - **Serializes calls**: at most one request is in flight per client
//! - **Retries**: transient failures are retried with capped exponential backoff
//! - **Re-authenticates**: an expired security token is replaced transparently
//! - **Throttles refreshes**: device list refreshes closer together than the
//!   refresh interval are ignored
//!
//! Device state is exposed as a map from serial number to [`Device`].
//!
//! # Quick Start
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> myq_lib::Result<()> {
//!     let client = myq_lib::login("user@example.com", "password").await?;
//!
//!     for (serial, device) in client.covers() {
//!         println!("{serial}: {:?}", device.door_state());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```no_run
//! use std::time::Duration;
//! use myq_lib::{ClientConfig, RetryPolicy};
//!
//! # async fn example() -> myq_lib::Result<()> {
//! let config = ClientConfig::new()
//!     .with_refresh_interval(Duration::from_secs(15))
//!     .with_retry_policy(RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(4)));
//!
//! let client = myq_lib::login_with_config(config, "user@example.com", "password").await?;
//! client.refresh_devices().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
pub mod device;
pub mod error;
pub mod protocol;
mod session;

pub use client::{ApiCall, Client, RefreshOutcome};
#[cfg(feature = "http")]
pub use client::{login, login_with_config};
pub use config::{ClientConfig, RetryPolicy};
pub use device::{Device, DeviceRegistry, DoorState, MergeSummary};
pub use error::{Error, ParseError, ProtocolError, RequestError, Result};
pub use protocol::{ApiRequest, ApiResponse, Method, Transport};
pub use session::{AccountInfo, Credentials, SecurityToken};
