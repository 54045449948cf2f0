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

//! uinput-backed virtual keyboard.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use input_linux::{
    EventKind, EventTime, InputEvent, InputId, KeyEvent as LinuxKeyEvent, SynchronizeEvent,
    UInputHandle,
};
use tracing::{debug, info, warn};

use super::{Key, KeyEvent, KeyEventSink};

/// Device nodes the uinput facility may live at, in probe order.
pub const UINPUT_CANDIDATES: [&str; 3] = ["/dev/input/uinput", "/dev/uinput", "/dev/misc/uinput"];

const BUS_USB: u16 = 0x03;
const VENDOR_ID: u16 = 0xef0f;
const PRODUCT_ID: u16 = 0xd746;
const VERSION: u16 = 1;

const NO_TIME: EventTime = EventTime::new(0, 0);

/// Return the first candidate node that exists.
pub fn locate_uinput<P: AsRef<Path>>(candidates: &[P]) -> Result<PathBuf> {
    candidates
        .iter()
        .map(|c| c.as_ref())
        .find(|path| path.exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            let tried: Vec<_> = candidates
                .iter()
                .map(|c| c.as_ref().display().to_string())
                .collect();
            anyhow!(
                "no uinput device node found (tried {}); is the uinput module loaded?",
                tried.join(", ")
            )
        })
}

/// Open the first existing candidate for reading and writing.
pub fn open_uinput<P: AsRef<Path>>(candidates: &[P]) -> Result<(PathBuf, File)> {
    let node = locate_uinput(candidates)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&node)
        .with_context(|| format!("Error opening {}", node.display()))?;
    Ok((node, file))
}

/// The process-wide virtual keyboard. Dropping it destroys the uinput device.
pub struct VirtualKeyboard {
    handle: UInputHandle<File>,
}

impl VirtualKeyboard {
    /// Create the keyboard, declaring the digit and Enter keys before the
    /// device is activated.
    pub fn create(name: &str) -> Result<Self> {
        let (node, file) = open_uinput(&UINPUT_CANDIDATES)?;
        debug!("Opened uinput node at {}", node.display());

        let handle = UInputHandle::new(file);
        handle
            .set_evbit(EventKind::Key)
            .context("Error enabling key events")?;
        for key in Key::ALL {
            handle
                .set_keybit(key.to_linux())
                .with_context(|| format!("Error declaring {:?}", key))?;
        }

        let id = InputId {
            bustype: BUS_USB,
            vendor: VENDOR_ID,
            product: PRODUCT_ID,
            version: VERSION,
        };
        handle
            .create(&id, name.as_bytes(), 0, &[])
            .with_context(|| format!("Error creating uinput device on {}", node.display()))?;

        info!("Virtual keyboard '{}' created", name);
        Ok(Self { handle })
    }
}

impl KeyEventSink for VirtualKeyboard {
    fn send(&mut self, event: KeyEvent) -> io::Result<()> {
        let key = LinuxKeyEvent::new(NO_TIME, event.key.to_linux(), event.state.to_linux());
        let events = [
            *InputEvent::from(key).as_raw(),
            *InputEvent::from(SynchronizeEvent::report(NO_TIME)).as_raw(),
        ];
        self.handle.write(&events).map(|_| ())
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        match self.handle.dev_destroy() {
            Ok(()) => debug!("Virtual keyboard destroyed"),
            Err(e) => warn!("Error destroying virtual keyboard: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn picks_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("input/uinput");
        let second = dir.path().join("uinput");
        let third = dir.path().join("misc-uinput");
        std::fs::write(&second, b"").unwrap();
        std::fs::write(&third, b"").unwrap();

        let found = locate_uinput(&[&missing, &second, &third]).unwrap();
        assert_eq!(found, second);
    }

    #[test]
    fn opens_the_located_node() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("input-uinput");
        let legacy = dir.path().join("misc-uinput");
        let canonical = dir.path().join("uinput");
        std::fs::write(&legacy, b"legacy").unwrap();
        std::fs::write(&canonical, b"canonical").unwrap();

        let (node, mut file) = open_uinput(&[&missing, &legacy, &canonical]).unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();

        assert_eq!(node, legacy);
        assert_eq!(contents, "legacy");
    }

    #[test]
    fn fails_when_no_candidate_exists() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");

        let err = locate_uinput(&[&a, &b]).unwrap_err().to_string();
        assert!(err.contains("no uinput device node found"));
        assert!(err.contains(&a.display().to_string()));
    }

    #[test]
    fn open_reports_missing_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_uinput(&[dir.path().join("uinput")]).unwrap_err();
        assert!(err.to_string().contains("no uinput device node found"));
    }
}
