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

//! Publishes the GATT object tree on the system bus.

use std::collections::HashMap;
use std::sync::Arc;

use dbus::arg::{Append, Arg, PropMap, RefArg};
use dbus::channel::{MatchingReceiver, Token};
use dbus::message::MatchRule;
use dbus::nonblock::SyncConnection;
use dbus::Path;
use dbus_crossroads::{Crossroads, IfaceBuilder, IfaceToken, MethodErr};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ble_constants::*;
use super::objects::{
    Advertisement, GattCharacteristic, GattObject, GattService, GattTree, PropertyValue,
};
use crate::input::KeyEventSink;
use crate::otp::OtpRelay;

/// The relay shared between WriteValue calls. The lock is held for a whole
/// emission so sequences never interleave.
pub type SharedRelay = Arc<Mutex<OtpRelay<Box<dyn KeyEventSink>>>>;

/// Data behind the characteristic object.
struct CharacteristicData {
    characteristic: GattCharacteristic,
    relay: SharedRelay,
}

impl GattObject for CharacteristicData {
    const INTERFACE: &'static str = GattCharacteristic::INTERFACE;
    const PROPERTIES: &'static [&'static str] = GattCharacteristic::PROPERTIES;

    fn path(&self) -> &str {
        self.characteristic.path()
    }

    fn property(&self, name: &str) -> Result<PropertyValue, crate::error::GattError> {
        self.characteristic.property(name)
    }
}

/// GATT server bound to one bus connection. Dropping it stops dispatching and
/// releases the object tree together with the relay it holds.
pub struct GattServer {
    conn: Arc<SyncConnection>,
    token: Option<Token>,
}

impl GattServer {
    /// Publish the tree and start dispatching method calls.
    pub fn start(conn: Arc<SyncConnection>, tree: GattTree, relay: SharedRelay) -> Self {
        let mut cr = object_tree(tree, relay);
        let spawn_conn = conn.clone();
        cr.set_async_support(Some((
            spawn_conn,
            Box::new(|fut| {
                tokio::spawn(fut);
            }),
        )));

        let token = conn.start_receive(
            MatchRule::new_method_call(),
            Box::new(move |msg, conn| {
                if cr.handle_message(msg, conn).is_err() {
                    debug!("Dropped a method call crossroads could not route");
                }
                true
            }),
        );

        info!("GATT object tree published");
        Self {
            conn,
            token: Some(token),
        }
    }
}

/// Dispatcher for the advertisement, the service and its characteristic, with
/// the ObjectManager at the application root. WriteValue needs async support
/// set by the caller.
fn object_tree(tree: GattTree, relay: SharedRelay) -> Crossroads {
    let mut cr = Crossroads::new();
    let adv_iface = register_advertisement(&mut cr);
    let svc_iface = register_service(&mut cr);
    let chr_iface = register_characteristic(&mut cr);
    let object_manager = cr.object_manager();

    cr.insert(APP_PATH, &[object_manager], ());
    cr.insert(ADVERTISEMENT_PATH, &[adv_iface], tree.advertisement);
    cr.insert(SERVICE_PATH, &[svc_iface], tree.service);
    cr.insert(
        CHARACTERISTIC_PATH,
        &[chr_iface],
        CharacteristicData {
            characteristic: tree.characteristic,
            relay,
        },
    );
    debug!(
        "Published {}, {} and {}",
        ADVERTISEMENT_PATH, SERVICE_PATH, CHARACTERISTIC_PATH
    );
    cr
}

impl Drop for GattServer {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.conn.stop_receive(token);
            debug!("GATT object tree withdrawn");
        }
    }
}

/// Register a read-only property answered from the object's table.
fn expose<O, A>(
    b: &mut IfaceBuilder<O>,
    name: &'static str,
    convert: fn(PropertyValue) -> Result<A, MethodErr>,
) where
    O: GattObject + Send + 'static,
    A: Arg + RefArg + Append + Send + Sync + 'static,
{
    b.property(name)
        .get(move |_, obj| convert(obj.property(name)?));
}

fn mismatch(value: PropertyValue) -> MethodErr {
    MethodErr::failed(&format!("unexpected property value {:?}", value))
}

fn string(value: PropertyValue) -> Result<String, MethodErr> {
    match value {
        PropertyValue::Str(s) => Ok(s),
        other => Err(mismatch(other)),
    }
}

fn boolean(value: PropertyValue) -> Result<bool, MethodErr> {
    match value {
        PropertyValue::Bool(b) => Ok(b),
        other => Err(mismatch(other)),
    }
}

fn object_path(value: PropertyValue) -> Result<Path<'static>, MethodErr> {
    match value {
        PropertyValue::ObjectPath(p) => Path::new(p).map_err(|e| MethodErr::failed(&e)),
        other => Err(mismatch(other)),
    }
}

fn strings(value: PropertyValue) -> Result<Vec<String>, MethodErr> {
    match value {
        PropertyValue::StrList(list) => Ok(list),
        other => Err(mismatch(other)),
    }
}

fn object_paths(value: PropertyValue) -> Result<Vec<Path<'static>>, MethodErr> {
    match value {
        PropertyValue::PathList(list) => list
            .into_iter()
            .map(|p| Path::new(p).map_err(|e| MethodErr::failed(&e)))
            .collect(),
        other => Err(mismatch(other)),
    }
}

fn manufacturer_data(value: PropertyValue) -> Result<HashMap<u16, Vec<u8>>, MethodErr> {
    match value {
        PropertyValue::ManufacturerData(map) => Ok(map),
        other => Err(mismatch(other)),
    }
}

fn service_data(value: PropertyValue) -> Result<HashMap<String, Vec<u8>>, MethodErr> {
    match value {
        PropertyValue::ServiceData(map) => Ok(map),
        other => Err(mismatch(other)),
    }
}

fn register_advertisement(cr: &mut Crossroads) -> IfaceToken<Advertisement> {
    cr.register(Advertisement::INTERFACE, |b: &mut IfaceBuilder<Advertisement>| {
        expose(b, "Type", string);
        expose(b, "ServiceUUIDs", strings);
        expose(b, "ManufacturerData", manufacturer_data);
        expose(b, "SolicitUUIDs", strings);
        expose(b, "ServiceData", service_data);
        expose(b, "IncludeTxPower", boolean);

        b.method("Release", (), (), |_, adv: &mut Advertisement, (): ()| {
            info!("Advertisement released by BlueZ");
            adv.release().map_err(MethodErr::from)
        });
    })
}

fn register_service(cr: &mut Crossroads) -> IfaceToken<GattService> {
    cr.register(GattService::INTERFACE, |b: &mut IfaceBuilder<GattService>| {
        expose(b, "UUID", string);
        expose(b, "Primary", boolean);
        expose(b, "Characteristics", object_paths);
        expose(b, "Includes", object_paths);
    })
}

fn register_characteristic(cr: &mut Crossroads) -> IfaceToken<CharacteristicData> {
    cr.register(CharacteristicData::INTERFACE, |b: &mut IfaceBuilder<CharacteristicData>| {
        expose(b, "UUID", string);
        expose(b, "Service", object_path);
        expose(b, "Notifying", boolean);
        expose(b, "Flags", strings);
        expose(b, "Descriptors", object_paths);

        b.method(
            "ReadValue",
            ("options",),
            ("value",),
            |_, data: &mut CharacteristicData, (_options,): (PropMap,)| {
                debug!("ReadValue refused");
                let value = data.characteristic.read_value()?;
                Ok((value,))
            },
        );

        b.method("StartNotify", (), (), |_, data: &mut CharacteristicData, (): ()| {
            debug!("StartNotify refused");
            data.characteristic.start_notify().map_err(MethodErr::from)
        });

        b.method("StopNotify", (), (), |_, data: &mut CharacteristicData, (): ()| {
            data.characteristic.stop_notify().map_err(MethodErr::from)
        });

        b.method_with_cr_async(
            "WriteValue",
            ("value", "options"),
            (),
            |mut ctx, cr, (value, _options): (Vec<u8>, PropMap)| {
                let relay = cr
                    .data_mut::<CharacteristicData>(ctx.path())
                    .map(|data| data.relay.clone());
                async move {
                    debug!("WriteValue: {} bytes", value.len());
                    let result = match relay {
                        Some(relay) => relay
                            .lock()
                            .await
                            .write_value(&value)
                            .await
                            .map_err(MethodErr::from),
                        None => Err(MethodErr::failed(&"characteristic is not published")),
                    };
                    ctx.reply(result)
                }
            },
        );
    })
}
