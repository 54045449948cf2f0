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

//! Types one-time passwords received over Bluetooth Low Energy.
//!
//! The service publishes a BLE advertisement and a GATT service through BlueZ.
//! A paired phone writes the OTP digits to a write-only characteristic and the
//! digits are typed on a uinput virtual keyboard, followed by Enter.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod logging;
pub mod otp;
pub mod service;

pub use config::Config;
pub use error::GattError;
