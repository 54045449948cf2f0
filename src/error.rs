// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors returned to BLE peers over D-Bus.

use dbus_crossroads::MethodErr;
use thiserror::Error;

/// Per-call protocol failures. Each maps onto a named D-Bus error so BlueZ can
/// translate it into the matching ATT error for the peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GattError {
    #[error("Invalid value length")]
    InvalidValueLength,
    #[error("Invalid value")]
    NotPermitted,
    #[error("Not supported")]
    NotSupported,
    #[error("Write failed")]
    Failed,
    #[error("No such property: {0}")]
    UnknownProperty(String),
}

impl GattError {
    /// D-Bus error name for this failure.
    pub fn dbus_name(&self) -> &'static str {
        match self {
            GattError::InvalidValueLength => "org.bluez.Error.InvalidValueLength",
            GattError::NotPermitted => "org.bluez.Error.NotPermitted",
            GattError::NotSupported => "org.bluez.Error.NotSupported",
            GattError::Failed => "org.bluez.Error.Failed",
            GattError::UnknownProperty(_) => "org.freedesktop.DBus.Error.UnknownProperty",
        }
    }
}

impl From<GattError> for MethodErr {
    fn from(err: GattError) -> Self {
        MethodErr::from((err.dbus_name(), err.to_string()))
    }
}
