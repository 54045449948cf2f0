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

//! Event processing for the registrar.

use tracing::{debug, info, warn};

use crate::bluetooth::registrar::{
    Discovery, RegistrationIssuer, RegistrationOutcome, RegistrationReply,
};
use crate::bluetooth::Registrar;

/// Events posted into the service loop.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    /// BlueZ reported new interfaces on an object, at startup or live.
    InterfacesAdded(Discovery),
    /// BlueZ withdrew interfaces from an object.
    InterfacesRemoved(Discovery),
    /// A registration call completed.
    RegistrationFinished(RegistrationReply),
}

/// Process events from BlueZ.
pub struct EventProcessor<I> {
    registrar: Registrar,
    issuer: I,
}

impl<I: RegistrationIssuer> EventProcessor<I> {
    pub fn new(issuer: I) -> Self {
        Self {
            registrar: Registrar::new(),
            issuer,
        }
    }

    /// Process a single event.
    pub fn process_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::InterfacesAdded(discovery) => {
                for request in self.registrar.interfaces_added(&discovery) {
                    info!(
                        "Calling {}.{} on {}",
                        request.kind.interface(),
                        request.kind.method(),
                        request.manager
                    );
                    self.issuer.issue(request);
                }
            }
            ServiceEvent::InterfacesRemoved(discovery) => {
                self.registrar.interfaces_removed(&discovery);
            }
            ServiceEvent::RegistrationFinished(reply) => {
                self.registrar.registration_finished(&reply);
                let request = &reply.request;
                match &reply.outcome {
                    RegistrationOutcome::Registered => info!(
                        "{} registered with {}",
                        request.kind.object_path(),
                        request.manager
                    ),
                    RegistrationOutcome::AlreadyRegistered => debug!(
                        "{} was already registered with {}",
                        request.kind.object_path(),
                        request.manager
                    ),
                    RegistrationOutcome::Rejected { name, message } => warn!(
                        "Error registering {} with {}: {}: {}",
                        request.kind.object_path(),
                        request.manager,
                        name,
                        message
                    ),
                }
            }
        }
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::ble_constants::{ADVERTISING_MANAGER_IFACE, GATT_MANAGER_IFACE};
    use crate::bluetooth::registrar::{InterfaceState, ManagerKind, RegistrationRequest};
    use dbus::Path;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingIssuer {
        issued: RefCell<Vec<RegistrationRequest>>,
    }

    impl RegistrationIssuer for &RecordingIssuer {
        fn issue(&self, request: RegistrationRequest) {
            self.issued.borrow_mut().push(request);
        }
    }

    fn adapter() -> Discovery {
        Discovery {
            object: Path::from("/org/bluez/hci0"),
            interfaces: vec![
                "org.bluez.Adapter1".to_string(),
                GATT_MANAGER_IFACE.to_string(),
                ADVERTISING_MANAGER_IFACE.to_string(),
            ],
        }
    }

    #[test]
    fn enumeration_and_live_signal_both_register() {
        let issuer = RecordingIssuer::default();
        let mut processor = EventProcessor::new(&issuer);

        // Startup enumeration and the live signal race for the same adapter.
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));

        assert_eq!(issuer.issued.borrow().len(), 4);
    }

    #[test]
    fn already_exists_keeps_service_registered() {
        let issuer = RecordingIssuer::default();
        let mut processor = EventProcessor::new(&issuer);
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));

        let requests = issuer.issued.borrow().clone();
        for request in requests {
            processor.process_event(ServiceEvent::RegistrationFinished(RegistrationReply {
                request,
                outcome: RegistrationOutcome::AlreadyRegistered,
            }));
        }

        let hci0 = Path::from("/org/bluez/hci0");
        assert_eq!(
            processor.registrar().state(&hci0, ManagerKind::Advertising),
            Some(InterfaceState::Registered)
        );
        assert_eq!(
            processor.registrar().state(&hci0, ManagerKind::Gatt),
            Some(InterfaceState::Registered)
        );
    }

    #[test]
    fn restarted_bluez_gets_registered_again() {
        let issuer = RecordingIssuer::default();
        let mut processor = EventProcessor::new(&issuer);
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));

        let requests = issuer.issued.borrow().clone();
        for request in requests {
            processor.process_event(ServiceEvent::RegistrationFinished(RegistrationReply {
                request,
                outcome: RegistrationOutcome::Registered,
            }));
        }
        // A restarted daemon announces hci0 again without an InterfacesRemoved.
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));

        assert_eq!(issuer.issued.borrow().len(), 4);
    }

    #[test]
    fn readded_adapter_registers_again() {
        let issuer = RecordingIssuer::default();
        let mut processor = EventProcessor::new(&issuer);
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));
        processor.process_event(ServiceEvent::InterfacesRemoved(adapter()));
        processor.process_event(ServiceEvent::InterfacesAdded(adapter()));

        assert_eq!(issuer.issued.borrow().len(), 4);
    }
}
