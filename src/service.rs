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

//! Service bootstrap and the main event loop.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::bluetooth::adapter::power_on_adapters;
use crate::bluetooth::{BluezClient, GattServer, GattTree, SharedRelay};
use crate::config::Config;
use crate::events::{EventProcessor, ServiceEvent};
use crate::input::{KeyEventSink, KeyboardInjector, VirtualKeyboard};
use crate::otp::OtpRelay;

/// Run until a termination signal arrives or the bus connection is lost.
pub async fn run(config: &Config) -> Result<()> {
    info!("Starting OTP relay...");

    if config.adapter.power_on {
        if let Err(e) = power_on_adapters().await {
            warn!("Could not power on Bluetooth adapters: {:#}", e);
        }
    }

    let keyboard = VirtualKeyboard::create(&config.keyboard.device_name)
        .context("Error setting up the virtual keyboard")?;
    let sink: Box<dyn KeyEventSink> = Box::new(keyboard);
    let relay: SharedRelay = Arc::new(Mutex::new(OtpRelay::new(KeyboardInjector::new(sink))));

    let (resource, conn) =
        dbus_tokio::connection::new_system_sync().context("Error connecting to system bus")?;
    let mut bus = tokio::spawn(resource);
    info!("Connected to system bus");

    let server = GattServer::start(conn.clone(), GattTree::new(), relay);

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let client = BluezClient::new(conn.clone(), events_tx.clone());
    let _watches = client
        .watch()
        .await
        .context("Error registering for bluetooth interfaces")?;

    match client.managed_objects().await {
        Ok(objects) => {
            for discovery in objects {
                let _ = events_tx.send(ServiceEvent::InterfacesAdded(discovery));
            }
        }
        Err(e) => warn!(
            "Error calling bluez ObjectManager, waiting for adapters to appear: {}",
            e
        ),
    }

    let mut processor = EventProcessor::new(client);
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let result = loop {
        tokio::select! {
            Some(event) = events_rx.recv() => processor.process_event(event),
            lost = &mut bus => {
                break Err(match lost {
                    Ok(err) => anyhow!("Lost connection to system bus: {}", err),
                    Err(join) => anyhow!("System bus task failed: {}", join),
                });
            }
            _ = sigterm.recv() => break Ok(()),
            _ = sigint.recv() => break Ok(()),
            _ = sighup.recv() => break Ok(()),
        }
    };

    info!("Shutting down");
    drop(server);
    result
}
