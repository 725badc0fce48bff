// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial-number keyed store of known devices.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::{Device, serial_number_of};

/// Counts produced by one [`DeviceRegistry::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Devices seen for the first time.
    pub inserted: usize,
    /// Known devices whose payload was replaced.
    pub updated: usize,
    /// Payloads dropped for lacking a serial number.
    pub skipped: usize,
}

/// Map from serial number to device.
///
/// Merges only ever insert or update; devices the service stops reporting
/// stay in the registry.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<Device>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges freshly fetched payloads.
    ///
    /// Payloads without a serial number are skipped. A known serial number
    /// has its payload replaced inside the existing entity.
    pub fn merge(&self, payloads: Vec<Value>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut devices = self.devices.write();

        for payload in payloads {
            let Some(serial) = serial_number_of(&payload) else {
                let name = payload
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>");
                tracing::debug!(name, "Skipping device without serial number");
                summary.skipped += 1;
                continue;
            };

            if let Some(device) = devices.get(&serial) {
                device.replace_payload(payload);
                summary.updated += 1;
            } else if let Some(device) = Device::from_payload(payload) {
                devices.insert(serial, Arc::new(device));
                summary.inserted += 1;
            }
        }

        summary
    }

    /// Returns the device with the given serial number.
    #[must_use]
    pub fn get(&self, serial_number: &str) -> Option<Arc<Device>> {
        self.devices.read().get(serial_number).cloned()
    }

    /// Returns a snapshot of all devices.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Arc<Device>> {
        self.devices.read().clone()
    }

    /// Returns a snapshot of the devices that are covers.
    #[must_use]
    pub fn covers(&self) -> HashMap<String, Arc<Device>> {
        self.devices
            .read()
            .iter()
            .filter(|(_, device)| device.is_cover())
            .map(|(serial, device)| (serial.clone(), Arc::clone(device)))
            .collect()
    }

    /// Returns the number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Returns whether no device is known yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
