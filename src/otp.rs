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

//! OTP write validation and keystroke dispatch.

use tracing::{debug, error, info};

use crate::bluetooth::ble_constants::MAX_VALUE_LEN;
use crate::error::GattError;
use crate::input::{Key, KeyEventSink, KeyboardInjector};

/// A validated OTP: between 1 and [`MAX_VALUE_LEN`] ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpPayload {
    keys: Vec<Key>,
}

impl OtpPayload {
    /// Validate a raw characteristic write. Nothing is emitted for a rejected
    /// value, wherever the offending byte sits.
    pub fn parse(value: &[u8]) -> Result<Self, GattError> {
        if value.is_empty() || value.len() > MAX_VALUE_LEN {
            return Err(GattError::InvalidValueLength);
        }

        let keys = value
            .iter()
            .map(|&byte| Key::from_ascii_digit(byte).ok_or(GattError::NotPermitted))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Digit keys followed by Enter, which submits the OTP field.
    pub fn keystrokes(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied().chain(std::iter::once(Key::Enter))
    }
}

/// Handles WriteValue on the OTP characteristic.
pub struct OtpRelay<S> {
    injector: KeyboardInjector<S>,
}

impl<S: KeyEventSink> OtpRelay<S> {
    pub fn new(injector: KeyboardInjector<S>) -> Self {
        Self { injector }
    }

    /// Validate `value` and type it, followed by Enter.
    pub async fn write_value(&mut self, value: &[u8]) -> Result<(), GattError> {
        let payload = match OtpPayload::parse(value) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Rejected write of {} bytes: {}", value.len(), e);
                return Err(e);
            }
        };

        if let Err(e) = self.injector.tap_all(payload.keystrokes()).await {
            error!("Keystroke injection failed: {:#}", anyhow::Error::new(e));
            return Err(GattError::Failed);
        }

        info!("Typed {}-digit code", payload.len());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn injector(&self) -> &KeyboardInjector<S> {
        &self.injector
    }
}
