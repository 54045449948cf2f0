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

//! Bus names, object paths and UUIDs shared by the GATT tree and the registrar.

use uuid::{uuid, Uuid};

/// OTP relay service UUID, also the single advertised service.
pub const SERVICE_UUID: Uuid = uuid!("b670003c-0079-465c-9ba7-6c0539ccd67f");

/// Write-only characteristic that receives the OTP digits.
pub const CHARACTERISTIC_UUID: Uuid = uuid!("f4186b06-d796-4327-af39-ac22c50bdca8");

/// Root of the GATT application; carries the ObjectManager.
pub const APP_PATH: &str = "/";
pub const ADVERTISEMENT_PATH: &str = "/adv";
pub const SERVICE_PATH: &str = "/svc";
pub const CHARACTERISTIC_PATH: &str = "/svc/chr";

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const BLUEZ_ROOT: &str = "/";

pub const ADVERTISING_MANAGER_IFACE: &str = "org.bluez.LEAdvertisingManager1";
pub const GATT_MANAGER_IFACE: &str = "org.bluez.GattManager1";
pub const ADVERTISEMENT_IFACE: &str = "org.bluez.LEAdvertisement1";
pub const SERVICE_IFACE: &str = "org.bluez.GattService1";
pub const CHARACTERISTIC_IFACE: &str = "org.bluez.GattCharacteristic1";
pub const OBJECT_MANAGER_IFACE: &str = "org.freedesktop.DBus.ObjectManager";

/// Characteristic flag requiring an authenticated, encrypted link before BlueZ
/// forwards a write.
pub const FLAG_ENCRYPT_AUTHENTICATED_WRITE: &str = "encrypt-authenticated-write";

/// Upper bound of an accepted OTP write.
pub const MAX_VALUE_LEN: usize = 32;

/// Timeout for outbound calls to BlueZ.
pub const CALL_TIMEOUT_SECS: u64 = 10;

/// Uppercase hyphenated form BlueZ reports back to peers.
pub fn uuid_string(uuid: &Uuid) -> String {
    format!("{:X}", uuid.hyphenated())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuids_render_uppercase() {
        assert_eq!(
            uuid_string(&SERVICE_UUID),
            "B670003C-0079-465C-9BA7-6C0539CCD67F"
        );
        assert_eq!(
            uuid_string(&CHARACTERISTIC_UUID),
            "F4186B06-D796-4327-AF39-AC22C50BDCA8"
        );
    }
}
