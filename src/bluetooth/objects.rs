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

//! The published GATT object tree.
//!
//! Every object is immutable and lives for the whole process. Property reads go
//! through [`GattObject::property`], which answers from a fixed table and rejects
//! anything else; the bus layer only translates the result.

use std::collections::HashMap;

use uuid::Uuid;

use super::ble_constants::*;
use crate::error::GattError;

/// Value of a published property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Str(String),
    Bool(bool),
    ObjectPath(String),
    StrList(Vec<String>),
    PathList(Vec<String>),
    /// `a{qay}`
    ManufacturerData(HashMap<u16, Vec<u8>>),
    /// `a{say}`
    ServiceData(HashMap<String, Vec<u8>>),
}

/// An object answering property reads for one D-Bus interface.
pub trait GattObject {
    /// Interface the properties belong to.
    const INTERFACE: &'static str;
    /// Names answered by [`GattObject::property`].
    const PROPERTIES: &'static [&'static str];

    fn path(&self) -> &str;

    fn property(&self, name: &str) -> Result<PropertyValue, GattError>;
}

/// Broadcast advertisement for the relay service.
#[derive(Debug, Clone)]
pub struct Advertisement {
    service_uuid: Uuid,
}

impl Advertisement {
    pub fn new(service_uuid: Uuid) -> Self {
        Self { service_uuid }
    }

    /// BlueZ dropped the advertisement; nothing is held for it.
    pub fn release(&self) -> Result<(), GattError> {
        Ok(())
    }
}

impl GattObject for Advertisement {
    const INTERFACE: &'static str = ADVERTISEMENT_IFACE;
    const PROPERTIES: &'static [&'static str] = &[
        "Type",
        "ServiceUUIDs",
        "ManufacturerData",
        "SolicitUUIDs",
        "ServiceData",
        "IncludeTxPower",
    ];

    fn path(&self) -> &str {
        ADVERTISEMENT_PATH
    }

    fn property(&self, name: &str) -> Result<PropertyValue, GattError> {
        Ok(match name {
            "Type" => PropertyValue::Str("broadcast".into()),
            "IncludeTxPower" => PropertyValue::Bool(true),
            "ServiceUUIDs" => PropertyValue::StrList(vec![uuid_string(&self.service_uuid)]),
            "SolicitUUIDs" => PropertyValue::StrList(Vec::new()),
            "ManufacturerData" => PropertyValue::ManufacturerData(HashMap::new()),
            "ServiceData" => PropertyValue::ServiceData(HashMap::new()),
            _ => return Err(GattError::UnknownProperty(name.to_string())),
        })
    }
}

/// The primary relay service.
#[derive(Debug, Clone)]
pub struct GattService {
    uuid: Uuid,
    characteristics: Vec<String>,
}

impl GattService {
    pub fn new(uuid: Uuid, characteristic_path: &str) -> Self {
        Self {
            uuid,
            characteristics: vec![characteristic_path.to_string()],
        }
    }
}

impl GattObject for GattService {
    const INTERFACE: &'static str = SERVICE_IFACE;
    const PROPERTIES: &'static [&'static str] = &["UUID", "Primary", "Characteristics", "Includes"];

    fn path(&self) -> &str {
        SERVICE_PATH
    }

    fn property(&self, name: &str) -> Result<PropertyValue, GattError> {
        Ok(match name {
            "UUID" => PropertyValue::Str(uuid_string(&self.uuid)),
            "Primary" => PropertyValue::Bool(true),
            "Characteristics" => PropertyValue::PathList(self.characteristics.clone()),
            "Includes" => PropertyValue::PathList(Vec::new()),
            _ => return Err(GattError::UnknownProperty(name.to_string())),
        })
    }
}

/// Write-only characteristic receiving the OTP.
#[derive(Debug, Clone)]
pub struct GattCharacteristic {
    uuid: Uuid,
    service_path: String,
    flags: Vec<String>,
}

impl GattCharacteristic {
    pub fn new(uuid: Uuid, service_path: &str) -> Self {
        Self {
            uuid,
            service_path: service_path.to_string(),
            flags: vec![FLAG_ENCRYPT_AUTHENTICATED_WRITE.to_string()],
        }
    }

    /// Reads are refused; the characteristic only accepts writes.
    pub fn read_value(&self) -> Result<Vec<u8>, GattError> {
        Err(GattError::NotSupported)
    }

    /// The characteristic never notifies.
    pub fn start_notify(&self) -> Result<(), GattError> {
        Err(GattError::NotSupported)
    }

    pub fn stop_notify(&self) -> Result<(), GattError> {
        Ok(())
    }
}

impl GattObject for GattCharacteristic {
    const INTERFACE: &'static str = CHARACTERISTIC_IFACE;
    const PROPERTIES: &'static [&'static str] =
        &["UUID", "Service", "Notifying", "Flags", "Descriptors"];

    fn path(&self) -> &str {
        CHARACTERISTIC_PATH
    }

    fn property(&self, name: &str) -> Result<PropertyValue, GattError> {
        Ok(match name {
            "UUID" => PropertyValue::Str(uuid_string(&self.uuid)),
            "Service" => PropertyValue::ObjectPath(self.service_path.clone()),
            "Notifying" => PropertyValue::Bool(false),
            "Flags" => PropertyValue::StrList(self.flags.clone()),
            "Descriptors" => PropertyValue::PathList(Vec::new()),
            _ => return Err(GattError::UnknownProperty(name.to_string())),
        })
    }
}

/// The three published objects.
#[derive(Debug, Clone)]
pub struct GattTree {
    pub advertisement: Advertisement,
    pub service: GattService,
    pub characteristic: GattCharacteristic,
}

impl GattTree {
    pub fn new() -> Self {
        Self {
            advertisement: Advertisement::new(SERVICE_UUID),
            service: GattService::new(SERVICE_UUID, CHARACTERISTIC_PATH),
            characteristic: GattCharacteristic::new(CHARACTERISTIC_UUID, SERVICE_PATH),
        }
    }
}

impl Default for GattTree {
    fn default() -> Self {
        Self::new()
    }
}
