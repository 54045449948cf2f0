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

//! Keyboard injection.
//!
//! A [`KeyboardInjector`] turns keys into timed press/release pairs and writes
//! them to a [`KeyEventSink`]. On a real host the sink is the uinput device from
//! [`uinput::VirtualKeyboard`].

pub mod keys;
pub mod uinput;

use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::trace;

pub use keys::{Key, KeyEvent, KeyState};
pub use uinput::VirtualKeyboard;

/// Pause after every key transition. Receiving input stacks drop keys that are
/// released faster than this.
pub const KEY_SETTLE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("failed to write {event:?} to the virtual keyboard")]
    Write {
        event: KeyEvent,
        #[source]
        source: io::Error,
    },
}

/// Destination for key transitions.
pub trait KeyEventSink: Send {
    fn send(&mut self, event: KeyEvent) -> io::Result<()>;
}

impl<S: KeyEventSink + ?Sized> KeyEventSink for Box<S> {
    fn send(&mut self, event: KeyEvent) -> io::Result<()> {
        (**self).send(event)
    }
}

/// Emits keys as press, settle, release, settle.
pub struct KeyboardInjector<S> {
    sink: S,
    settle: Duration,
}

impl<S: KeyEventSink> KeyboardInjector<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            settle: KEY_SETTLE_DELAY,
        }
    }

    /// Press and release `key`.
    pub async fn tap(&mut self, key: Key) -> Result<(), InjectError> {
        self.write(KeyEvent::press(key))?;
        tokio::time::sleep(self.settle).await;
        self.write(KeyEvent::release(key))?;
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    /// Tap every key in order, stopping at the first failure.
    pub async fn tap_all<I>(&mut self, keys: I) -> Result<(), InjectError>
    where
        I: IntoIterator<Item = Key>,
    {
        for key in keys {
            self.tap(key).await?;
        }
        Ok(())
    }

    fn write(&mut self, event: KeyEvent) -> Result<(), InjectError> {
        trace!("Key event: {:?}", event);
        self.sink
            .send(event)
            .map_err(|source| InjectError::Write { event, source })
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }
}

/// In-memory sink used by tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub events: Vec<KeyEvent>,
        /// Fail the write with this zero-based index.
        pub fail_at: Option<usize>,
        attempts: usize,
    }

    impl RecordingSink {
        pub fn failing_at(index: usize) -> Self {
            Self {
                fail_at: Some(index),
                ..Default::default()
            }
        }
    }

    impl KeyEventSink for RecordingSink {
        fn send(&mut self, event: KeyEvent) -> io::Result<()> {
            let attempt = self.attempts;
            self.attempts += 1;
            if self.fail_at == Some(attempt) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"));
            }
            self.events.push(event);
            Ok(())
        }
    }
}
