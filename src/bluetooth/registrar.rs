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

//! Registration of the advertisement and GATT application with BlueZ.
//!
//! Manager interfaces are learned from two sources: a `GetManagedObjects` call
//! at startup and the live `InterfacesAdded` signal. Every report issues both
//! calls again; BlueZ answers a repeat with `AlreadyExists`, which is benign.
//! The ledger only records the last known state of each interface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dbus::arg::PropMap;
use dbus::message::MatchRule;
use dbus::nonblock::stdintf::org_freedesktop_dbus::ObjectManager;
use dbus::nonblock::{MsgMatch, Proxy, SyncConnection};
use dbus::{Message, Path};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ble_constants::*;
use crate::events::ServiceEvent;

/// BlueZ manager interfaces the service registers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerKind {
    Advertising,
    Gatt,
}

impl ManagerKind {
    pub fn from_interface(name: &str) -> Option<Self> {
        match name {
            ADVERTISING_MANAGER_IFACE => Some(ManagerKind::Advertising),
            GATT_MANAGER_IFACE => Some(ManagerKind::Gatt),
            _ => None,
        }
    }

    pub fn interface(self) -> &'static str {
        match self {
            ManagerKind::Advertising => ADVERTISING_MANAGER_IFACE,
            ManagerKind::Gatt => GATT_MANAGER_IFACE,
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            ManagerKind::Advertising => "RegisterAdvertisement",
            ManagerKind::Gatt => "RegisterApplication",
        }
    }

    /// Our object handed to the manager.
    pub fn object_path(self) -> &'static str {
        match self {
            ManagerKind::Advertising => ADVERTISEMENT_PATH,
            ManagerKind::Gatt => APP_PATH,
        }
    }
}

/// An object and the interface names reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub object: Path<'static>,
    pub interfaces: Vec<String>,
}

impl Discovery {
    /// Parse an `InterfacesAdded(o, a{sa{sv}})` signal.
    pub fn from_interfaces_added(msg: &Message) -> Result<Self, dbus::arg::TypeMismatchError> {
        let (object, interfaces): (Path, HashMap<String, PropMap>) = msg.read2()?;
        Ok(Self {
            object: object.into_static(),
            interfaces: interfaces.into_keys().collect(),
        })
    }

    /// Parse an `InterfacesRemoved(o, as)` signal.
    pub fn from_interfaces_removed(msg: &Message) -> Result<Self, dbus::arg::TypeMismatchError> {
        let (object, interfaces): (Path, Vec<String>) = msg.read2()?;
        Ok(Self {
            object: object.into_static(),
            interfaces,
        })
    }
}

/// A registration call to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub manager: Path<'static>,
    pub kind: ManagerKind,
}

/// How BlueZ answered a registration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered,
    Rejected { name: String, message: String },
}

impl RegistrationOutcome {
    pub fn from_result(result: Result<(), dbus::Error>) -> Self {
        match result {
            Ok(()) => RegistrationOutcome::Registered,
            Err(e) if e.name() == Some("org.bluez.Error.AlreadyExists") => {
                RegistrationOutcome::AlreadyRegistered
            }
            Err(e) => RegistrationOutcome::Rejected {
                name: e.name().unwrap_or("unknown").to_string(),
                message: e.message().unwrap_or("").to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReply {
    pub request: RegistrationRequest,
    pub outcome: RegistrationOutcome,
}

/// Per-interface registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceState {
    InFlight,
    Registered,
}

/// Tracks registration state per manager interface.
#[derive(Debug, Default)]
pub struct Registrar {
    ledger: HashMap<(Path<'static>, ManagerKind), InterfaceState>,
}

impl Registrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests to issue for a newly reported object.
    pub fn interfaces_added(&mut self, discovery: &Discovery) -> Vec<RegistrationRequest> {
        let mut requests = Vec::new();
        for kind in discovery
            .interfaces
            .iter()
            .filter_map(|name| ManagerKind::from_interface(name))
        {
            let key = (discovery.object.clone(), kind);
            if let Some(state) = self.ledger.insert(key, InterfaceState::InFlight) {
                debug!(
                    "{} on {} reported again (was {:?})",
                    kind.interface(),
                    discovery.object,
                    state
                );
            }
            requests.push(RegistrationRequest {
                manager: discovery.object.clone(),
                kind,
            });
        }
        requests
    }

    /// Forget interfaces that went away.
    pub fn interfaces_removed(&mut self, discovery: &Discovery) {
        for kind in discovery
            .interfaces
            .iter()
            .filter_map(|name| ManagerKind::from_interface(name))
        {
            if self.ledger.remove(&(discovery.object.clone(), kind)).is_some() {
                debug!("{} removed from {}", kind.interface(), discovery.object);
            }
        }
    }

    /// Record the answer to an earlier request.
    pub fn registration_finished(&mut self, reply: &RegistrationReply) {
        let key = (reply.request.manager.clone(), reply.request.kind);
        match reply.outcome {
            RegistrationOutcome::Registered | RegistrationOutcome::AlreadyRegistered => {
                self.ledger.insert(key, InterfaceState::Registered);
            }
            RegistrationOutcome::Rejected { .. } => {
                self.ledger.remove(&key);
            }
        }
    }

    pub fn state(&self, manager: &Path<'static>, kind: ManagerKind) -> Option<InterfaceState> {
        self.ledger.get(&(manager.clone(), kind)).copied()
    }
}

/// Issues registration calls without waiting for them.
pub trait RegistrationIssuer {
    fn issue(&self, request: RegistrationRequest);
}

/// D-Bus side of the registrar.
pub struct BluezClient {
    conn: Arc<SyncConnection>,
    events: mpsc::UnboundedSender<ServiceEvent>,
}

impl BluezClient {
    pub fn new(conn: Arc<SyncConnection>, events: mpsc::UnboundedSender<ServiceEvent>) -> Self {
        Self { conn, events }
    }

    fn proxy<'a>(&self, path: Path<'a>) -> Proxy<'a, Arc<SyncConnection>> {
        Proxy::new(
            BLUEZ_SERVICE,
            path,
            Duration::from_secs(CALL_TIMEOUT_SECS),
            self.conn.clone(),
        )
    }

    /// Subscribe to interface additions and removals on the BlueZ root.
    /// The returned matches must be kept for the subscriptions to stay alive.
    pub async fn watch(&self) -> Result<Vec<MsgMatch>, dbus::Error> {
        let added = MatchRule::new_signal(OBJECT_MANAGER_IFACE, "InterfacesAdded")
            .with_sender(BLUEZ_SERVICE)
            .with_path(BLUEZ_ROOT);
        let removed = MatchRule::new_signal(OBJECT_MANAGER_IFACE, "InterfacesRemoved")
            .with_sender(BLUEZ_SERVICE)
            .with_path(BLUEZ_ROOT);

        let tx = self.events.clone();
        let added = self.conn.add_match(added).await?.msg_cb(move |msg| {
            match Discovery::from_interfaces_added(&msg) {
                Ok(discovery) => {
                    let _ = tx.send(ServiceEvent::InterfacesAdded(discovery));
                }
                Err(e) => warn!("Dropping malformed InterfacesAdded signal: {}", e),
            }
            true
        });

        let tx = self.events.clone();
        let removed = self.conn.add_match(removed).await?.msg_cb(move |msg| {
            match Discovery::from_interfaces_removed(&msg) {
                Ok(discovery) => {
                    let _ = tx.send(ServiceEvent::InterfacesRemoved(discovery));
                }
                Err(e) => warn!("Dropping malformed InterfacesRemoved signal: {}", e),
            }
            true
        });

        Ok(vec![added, removed])
    }

    /// Every object BlueZ currently exports, with its interface names.
    pub async fn managed_objects(&self) -> Result<Vec<Discovery>, dbus::Error> {
        let objects = self.proxy(Path::from(BLUEZ_ROOT)).get_managed_objects().await?;
        Ok(objects
            .into_iter()
            .map(|(object, interfaces)| Discovery {
                object,
                interfaces: interfaces.into_keys().collect(),
            })
            .collect())
    }
}

impl RegistrationIssuer for BluezClient {
    fn issue(&self, request: RegistrationRequest) {
        let proxy = self.proxy(request.manager.clone());
        let events = self.events.clone();

        tokio::spawn(async move {
            let options = PropMap::new();
            let result: Result<(), dbus::Error> = proxy
                .method_call(
                    request.kind.interface(),
                    request.kind.method(),
                    (Path::from(request.kind.object_path()), options),
                )
                .await;

            let reply = RegistrationReply {
                outcome: RegistrationOutcome::from_result(result),
                request,
            };
            let _ = events.send(ServiceEvent::RegistrationFinished(reply));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hci0() -> Path<'static> {
        Path::from("/org/bluez/hci0")
    }

    fn discovery(object: Path<'static>, interfaces: &[&str]) -> Discovery {
        Discovery {
            object,
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn adapter_with_managers() -> Discovery {
        discovery(
            hci0(),
            &[
                "org.bluez.Adapter1",
                GATT_MANAGER_IFACE,
                ADVERTISING_MANAGER_IFACE,
                "org.freedesktop.DBus.Properties",
            ],
        )
    }

    fn kinds(requests: &[RegistrationRequest]) -> Vec<ManagerKind> {
        let mut kinds: Vec<_> = requests.iter().map(|r| r.kind).collect();
        kinds.sort_by_key(|k| k.method());
        kinds
    }

    #[test]
    fn manager_kinds_map_to_bluez_calls() {
        assert_eq!(
            ManagerKind::from_interface("org.bluez.LEAdvertisingManager1"),
            Some(ManagerKind::Advertising)
        );
        assert_eq!(ManagerKind::from_interface("org.bluez.Adapter1"), None);
        assert_eq!(ManagerKind::Advertising.method(), "RegisterAdvertisement");
        assert_eq!(ManagerKind::Advertising.object_path(), "/adv");
        assert_eq!(ManagerKind::Gatt.method(), "RegisterApplication");
        assert_eq!(ManagerKind::Gatt.object_path(), "/");
    }

    #[test]
    fn registers_both_managers_of_an_adapter() {
        let mut registrar = Registrar::new();
        let requests = registrar.interfaces_added(&adapter_with_managers());

        assert_eq!(kinds(&requests), vec![ManagerKind::Advertising, ManagerKind::Gatt]);
        assert!(requests.iter().all(|r| r.manager == hci0()));
        assert_eq!(
            registrar.state(&hci0(), ManagerKind::Gatt),
            Some(InterfaceState::InFlight)
        );
    }

    #[test]
    fn ignores_objects_without_managers() {
        let mut registrar = Registrar::new();
        let device = discovery(
            Path::from("/org/bluez/hci0/dev_00_11_22_33_44_55"),
            &["org.bluez.Device1"],
        );
        assert!(registrar.interfaces_added(&device).is_empty());
    }

    #[test]
    fn handles_managers_appearing_separately() {
        let mut registrar = Registrar::new();
        let gatt = registrar.interfaces_added(&discovery(hci0(), &[GATT_MANAGER_IFACE]));
        let adv = registrar.interfaces_added(&discovery(hci0(), &[ADVERTISING_MANAGER_IFACE]));

        assert_eq!(kinds(&gatt), vec![ManagerKind::Gatt]);
        assert_eq!(kinds(&adv), vec![ManagerKind::Advertising]);
    }

    #[test]
    fn duplicate_discovery_issues_again_while_in_flight() {
        let mut registrar = Registrar::new();
        assert_eq!(registrar.interfaces_added(&adapter_with_managers()).len(), 2);
        assert_eq!(registrar.interfaces_added(&adapter_with_managers()).len(), 2);
    }

    #[test]
    fn rediscovery_after_success_issues_again() {
        // bluetoothd restarting re-announces its adapters without removing them first.
        let mut registrar = Registrar::new();
        for request in registrar.interfaces_added(&adapter_with_managers()) {
            registrar.registration_finished(&RegistrationReply {
                request,
                outcome: RegistrationOutcome::Registered,
            });
        }
        assert_eq!(
            registrar.state(&hci0(), ManagerKind::Advertising),
            Some(InterfaceState::Registered)
        );

        let again = registrar.interfaces_added(&adapter_with_managers());
        assert_eq!(kinds(&again), vec![ManagerKind::Advertising, ManagerKind::Gatt]);
        assert_eq!(
            registrar.state(&hci0(), ManagerKind::Advertising),
            Some(InterfaceState::InFlight)
        );
    }

    #[test]
    fn already_exists_counts_as_registered() {
        let mut registrar = Registrar::new();
        let request = registrar
            .interfaces_added(&discovery(hci0(), &[GATT_MANAGER_IFACE]))
            .remove(0);
        registrar.registration_finished(&RegistrationReply {
            request,
            outcome: RegistrationOutcome::AlreadyRegistered,
        });

        assert_eq!(
            registrar.state(&hci0(), ManagerKind::Gatt),
            Some(InterfaceState::Registered)
        );
    }

    #[test]
    fn rejection_clears_the_interface() {
        let mut registrar = Registrar::new();
        let request = registrar
            .interfaces_added(&discovery(hci0(), &[ADVERTISING_MANAGER_IFACE]))
            .remove(0);
        registrar.registration_finished(&RegistrationReply {
            request,
            outcome: RegistrationOutcome::Rejected {
                name: "org.bluez.Error.Failed".into(),
                message: "Maximum advertisements reached".into(),
            },
        });

        assert_eq!(registrar.state(&hci0(), ManagerKind::Advertising), None);
        let retry = registrar.interfaces_added(&discovery(hci0(), &[ADVERTISING_MANAGER_IFACE]));
        assert_eq!(kinds(&retry), vec![ManagerKind::Advertising]);
    }

    #[test]
    fn removal_forgets_the_interface() {
        let mut registrar = Registrar::new();
        for request in registrar.interfaces_added(&adapter_with_managers()) {
            registrar.registration_finished(&RegistrationReply {
                request,
                outcome: RegistrationOutcome::Registered,
            });
        }

        registrar.interfaces_removed(&discovery(hci0(), &[GATT_MANAGER_IFACE]));

        assert_eq!(registrar.state(&hci0(), ManagerKind::Gatt), None);
        assert_eq!(
            registrar.state(&hci0(), ManagerKind::Advertising),
            Some(InterfaceState::Registered)
        );
    }

    #[test]
    fn adapters_are_tracked_independently() {
        let mut registrar = Registrar::new();
        let hci1 = Path::from("/org/bluez/hci1");
        assert_eq!(registrar.interfaces_added(&adapter_with_managers()).len(), 2);
        assert_eq!(
            registrar
                .interfaces_added(&discovery(hci1, &[GATT_MANAGER_IFACE, ADVERTISING_MANAGER_IFACE]))
                .len(),
            2
        );
    }

    #[test]
    fn outcome_from_dbus_errors() {
        assert_eq!(
            RegistrationOutcome::from_result(Ok(())),
            RegistrationOutcome::Registered
        );
        let exists = dbus::Error::new_custom("org.bluez.Error.AlreadyExists", "Already Exists");
        assert_eq!(
            RegistrationOutcome::from_result(Err(exists)),
            RegistrationOutcome::AlreadyRegistered
        );
        let failed = dbus::Error::new_custom("org.bluez.Error.InvalidArguments", "Bad");
        assert_eq!(
            RegistrationOutcome::from_result(Err(failed)),
            RegistrationOutcome::Rejected {
                name: "org.bluez.Error.InvalidArguments".into(),
                message: "Bad".into(),
            }
        );
    }

    #[test]
    fn parses_interfaces_added_signal() {
        let mut interfaces: HashMap<String, PropMap> = HashMap::new();
        interfaces.insert(GATT_MANAGER_IFACE.to_string(), PropMap::new());
        interfaces.insert(ADVERTISING_MANAGER_IFACE.to_string(), PropMap::new());
        let msg = Message::signal(
            &Path::from("/"),
            &OBJECT_MANAGER_IFACE.into(),
            &"InterfacesAdded".into(),
        )
        .append2(hci0(), interfaces);

        let mut parsed = Discovery::from_interfaces_added(&msg).unwrap();
        parsed.interfaces.sort();
        assert_eq!(parsed.object, hci0());
        assert_eq!(
            parsed.interfaces,
            vec![GATT_MANAGER_IFACE.to_string(), ADVERTISING_MANAGER_IFACE.to_string()]
        );
    }

    #[test]
    fn malformed_signal_is_an_error() {
        let msg = Message::signal(
            &Path::from("/"),
            &OBJECT_MANAGER_IFACE.into(),
            &"InterfacesAdded".into(),
        )
        .append1("not an object path");

        assert!(Discovery::from_interfaces_added(&msg).is_err());
    }

    #[test]
    fn parses_interfaces_removed_signal() {
        let msg = Message::signal(
            &Path::from("/"),
            &OBJECT_MANAGER_IFACE.into(),
            &"InterfacesRemoved".into(),
        )
        .append2(hci0(), vec![GATT_MANAGER_IFACE.to_string()]);

        let parsed = Discovery::from_interfaces_removed(&msg).unwrap();
        assert_eq!(parsed, discovery(hci0(), &[GATT_MANAGER_IFACE]));
    }
}
