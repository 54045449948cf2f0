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

//! Adapter power management.

use anyhow::Result;
use tracing::{debug, info};

/// Power on every adapter BlueZ knows about.
pub async fn power_on_adapters() -> Result<()> {
    let session = bluer::Session::new().await?;
    let names = session.adapter_names().await?;
    if names.is_empty() {
        info!("No Bluetooth adapter present yet");
    }

    for name in names {
        let adapter = session.adapter(&name)?;
        if adapter.is_powered().await? {
            debug!("Adapter {} already powered", name);
            continue;
        }
        info!("Powering on Bluetooth adapter {}...", name);
        adapter.set_powered(true).await?;
    }
    Ok(())
}
