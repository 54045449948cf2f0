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

//! Key definitions for the virtual keyboard.

/// Keys the virtual keyboard can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Enter,
}

impl Key {
    /// Every key the device declares as a capability.
    pub const ALL: [Key; 11] = [
        Key::Digit0,
        Key::Digit1,
        Key::Digit2,
        Key::Digit3,
        Key::Digit4,
        Key::Digit5,
        Key::Digit6,
        Key::Digit7,
        Key::Digit8,
        Key::Digit9,
        Key::Enter,
    ];

    /// Map an ASCII digit byte to its key.
    pub fn from_ascii_digit(byte: u8) -> Option<Key> {
        let key = match byte {
            b'0' => Key::Digit0,
            b'1' => Key::Digit1,
            b'2' => Key::Digit2,
            b'3' => Key::Digit3,
            b'4' => Key::Digit4,
            b'5' => Key::Digit5,
            b'6' => Key::Digit6,
            b'7' => Key::Digit7,
            b'8' => Key::Digit8,
            b'9' => Key::Digit9,
            _ => return None,
        };
        Some(key)
    }

    /// Get the Linux input key.
    pub fn to_linux(self) -> input_linux::Key {
        use input_linux::Key as LKey;
        match self {
            Key::Digit0 => LKey::Num0,
            Key::Digit1 => LKey::Num1,
            Key::Digit2 => LKey::Num2,
            Key::Digit3 => LKey::Num3,
            Key::Digit4 => LKey::Num4,
            Key::Digit5 => LKey::Num5,
            Key::Digit6 => LKey::Num6,
            Key::Digit7 => LKey::Num7,
            Key::Digit8 => LKey::Num8,
            Key::Digit9 => LKey::Num9,
            Key::Enter => LKey::Enter,
        }
    }
}

/// Direction of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

impl KeyState {
    /// EV_KEY event value.
    pub fn to_linux(self) -> input_linux::KeyState {
        match self {
            KeyState::Pressed => input_linux::KeyState::PRESSED,
            KeyState::Released => input_linux::KeyState::RELEASED,
        }
    }
}

/// A single key transition written to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub state: KeyState,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Pressed,
        }
    }

    pub fn release(key: Key) -> Self {
        Self {
            key,
            state: KeyState::Released,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_ascii_digit() {
        for (i, byte) in (b'0'..=b'9').enumerate() {
            assert_eq!(Key::from_ascii_digit(byte), Some(Key::ALL[i]));
        }
    }

    #[test]
    fn rejects_non_digits() {
        for byte in [b'a', b' ', b'/', b':', b'\n', 0x00, 0xff] {
            assert_eq!(Key::from_ascii_digit(byte), None);
        }
    }

    #[test]
    fn codes_match_linux_keycodes() {
        assert_eq!(Key::Digit1.to_linux() as u16, 2);
        assert_eq!(Key::Digit0.to_linux() as u16, 11);
        assert_eq!(Key::Enter.to_linux() as u16, 28);
    }
}
