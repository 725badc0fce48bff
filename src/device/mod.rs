// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device entities reported by the cloud service.
//!
//! A [`Device`] wraps the latest JSON payload the service returned for one
//! serial number. Devices are shared as `Arc<Device>`; a refresh replaces the
//! payload inside the existing entity, so a handle obtained earlier keeps
//! observing current data.
//!
//! ```
//! use myq_lib::Device;
//! use serde_json::json;
//!
//! let device = Device::from_payload(json!({
//!     "serial_number": "GW0123",
//!     "device_family": "garagedoor",
//!     "name": "Garage",
//!     "state": { "door_state": "closed", "online": true }
//! }))
//! .unwrap();
//!
//! assert_eq!(device.serial_number(), "GW0123");
//! assert!(device.is_cover());
//! ```

mod registry;

pub use registry::{DeviceRegistry, MergeSummary};

use std::fmt;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;

use crate::protocol;

/// Device family of hubs/gateways, which are not covers.
pub const GATEWAY_FAMILY: &str = "gateway";

/// Payload field holding the device's serial number.
pub const SERIAL_NUMBER_FIELD: &str = "serial_number";

/// Position of a garage door or gate as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    /// Fully open.
    Open,
    /// Fully closed.
    Closed,
    /// Moving towards open.
    Opening,
    /// Moving towards closed.
    Closing,
    /// Stopped part-way.
    Stopped,
    /// Moving, direction not reported.
    Transition,
    /// Reversed after detecting an obstruction.
    Autoreverse,
    /// Any state this library does not know.
    #[serde(other)]
    Unknown,
}

/// A device known to the client.
pub struct Device {
    serial_number: String,
    payload: RwLock<Value>,
}

impl Device {
    /// Creates a device from a service payload.
    ///
    /// Returns `None` when the payload has no string or numeric
    /// `serial_number`.
    #[must_use]
    pub fn from_payload(payload: Value) -> Option<Self> {
        let serial_number = serial_number_of(&payload)?;
        Some(Self {
            serial_number,
            payload: RwLock::new(payload),
        })
    }

    /// Returns the serial number, the device's stable identity.
    #[must_use]
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Returns a copy of the latest payload.
    #[must_use]
    pub fn payload(&self) -> Value {
        self.payload.read().clone()
    }

    /// Replaces the payload in place.
    pub(crate) fn replace_payload(&self, payload: Value) {
        *self.payload.write() = payload;
    }

    fn string_field(&self, pointer: &str) -> Option<String> {
        self.payload
            .read()
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Returns the user-assigned name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.string_field("/name")
    }

    /// Returns the device family, e.g. `garagedoor` or `gateway`.
    #[must_use]
    pub fn device_family(&self) -> Option<String> {
        self.string_field("/device_family")
    }

    /// Returns the device platform, e.g. `myq`.
    #[must_use]
    pub fn device_platform(&self) -> Option<String> {
        self.string_field("/device_platform")
    }

    /// Returns the device type, e.g. `wifigaragedooropener`.
    #[must_use]
    pub fn device_type(&self) -> Option<String> {
        self.string_field("/device_type")
    }

    /// Returns the serial number of the hub this device is attached to.
    #[must_use]
    pub fn parent_device_id(&self) -> Option<String> {
        self.string_field("/parent_device_id")
    }

    /// Returns the firmware version.
    #[must_use]
    pub fn firmware_version(&self) -> Option<String> {
        self.string_field("/state/firmware_version")
    }

    /// Returns whether the service reports the device as reachable.
    #[must_use]
    pub fn online(&self) -> bool {
        self.payload
            .read()
            .pointer("/state/online")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Returns the door position, if the device reports one.
    #[must_use]
    pub fn door_state(&self) -> Option<DoorState> {
        self.payload
            .read()
            .pointer("/state/door_state")
            .and_then(|value| DoorState::deserialize(value).ok())
    }

    /// Returns whether the device is a controllable cover.
    ///
    /// Every device whose family is not `gateway` counts as a cover.
    #[must_use]
    pub fn is_cover(&self) -> bool {
        self.payload
            .read()
            .get("device_family")
            .and_then(Value::as_str)
            != Some(GATEWAY_FAMILY)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("serial_number", &self.serial_number)
            .field("device_family", &self.device_family())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Extracts the serial number of a raw payload.
pub(crate) fn serial_number_of(payload: &Value) -> Option<String> {
    payload.get(SERIAL_NUMBER_FIELD).and_then(protocol::identifier)
}
