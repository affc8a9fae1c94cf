//! GATT service registry
//!
//! The registry is the fixed attribute set of the device: services, their
//! read-only characteristics and the source bound to each one. It is
//! assembled with [`RegistryBuilder`], installed into the stack once and is
//! read-only afterwards. There is no API to add or remove
//! attributes from a built [`Registry`].

use core::fmt;

use crate::config::gatt::{MAX_CHARACTERISTICS, MAX_CHARACTERISTICS_PER_SERVICE, MAX_SERVICES};
use crate::gatt::sources::ValueSource;
use crate::gatt::traits::{AttributeHandle, AttributeStore, StackError, TableLayout};
use crate::gatt::uuid::BleUuid;
use heapless::Vec;

/// Access policy of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Readable by the central, nothing else
    Read,
}

/// One characteristic and the source that produces its value
#[derive(Clone, Copy)]
pub struct Characteristic<'s> {
    uuid: BleUuid,
    access: Access,
    source: &'s dyn ValueSource,
}

impl<'s> Characteristic<'s> {
    /// Read-only characteristic backed by `source`
    pub fn read_only(uuid: BleUuid, source: &'s dyn ValueSource) -> Self {
        Self {
            uuid,
            access: Access::Read,
            source,
        }
    }

    pub fn uuid(&self) -> BleUuid {
        self.uuid
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn source(&self) -> &'s dyn ValueSource {
        self.source
    }
}

impl fmt::Debug for Characteristic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Characteristic")
            .field("uuid", &self.uuid)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// A primary service and its characteristics, in handle order
#[derive(Debug, Clone)]
pub struct Service<'s> {
    uuid: BleUuid,
    characteristics: Vec<Characteristic<'s>, MAX_CHARACTERISTICS_PER_SERVICE>,
    overflowed: bool,
}

impl<'s> Service<'s> {
    /// Create an empty service
    pub fn new(uuid: BleUuid) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
            overflowed: false,
        }
    }

    /// Append a characteristic. Overflow is reported when the registry is built.
    pub fn with_characteristic(mut self, characteristic: Characteristic<'s>) -> Self {
        if self.characteristics.push(characteristic).is_err() {
            self.overflowed = true;
        }
        self
    }

    pub fn uuid(&self) -> BleUuid {
        self.uuid
    }

    pub fn characteristics(&self) -> &[Characteristic<'s>] {
        &self.characteristics
    }
}

/// Identifies a characteristic by (service UUID, characteristic UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicId {
    pub service: BleUuid,
    pub characteristic: BleUuid,
}

impl CharacteristicId {
    pub const fn new(service: BleUuid, characteristic: BleUuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }
}

/// Registry construction errors. All of them are fatal at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    /// No services were defined
    Empty,
    /// More services than the registry can hold
    TooManyServices,
    /// More characteristics than a service or the registry can hold
    TooManyCharacteristics,
    /// The same service UUID appears twice
    DuplicateService(BleUuid),
    /// The same characteristic UUID appears twice within a service
    DuplicateCharacteristic {
        service: BleUuid,
        characteristic: BleUuid,
    },
    /// The stack rejected the count pass
    Count(StackError),
    /// The stack failed while installing services
    Install(StackError),
    /// The stack returned a different number of value handles than requested
    HandleMismatch,
}

/// Collects services before they are handed to the stack
pub struct RegistryBuilder<'s> {
    services: Vec<Service<'s>, MAX_SERVICES>,
    overflowed: bool,
}

impl<'s> RegistryBuilder<'s> {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            overflowed: false,
        }
    }

    /// Append a service. Overflow is reported by [`build`](Self::build).
    pub fn service(mut self, service: Service<'s>) -> Self {
        if self.services.push(service).is_err() {
            self.overflowed = true;
        }
        self
    }

    /// Table sizes required by the collected services
    pub fn layout(&self) -> TableLayout {
        layout_of(&self.services)
    }

    /// Check the definitions before the stack is touched
    fn validate(&self) -> Result<(), RegistrationError> {
        if self.overflowed {
            return Err(RegistrationError::TooManyServices);
        }
        if self.services.is_empty() {
            return Err(RegistrationError::Empty);
        }
        if self.layout().characteristics > MAX_CHARACTERISTICS {
            return Err(RegistrationError::TooManyCharacteristics);
        }

        for (i, service) in self.services.iter().enumerate() {
            if service.overflowed {
                return Err(RegistrationError::TooManyCharacteristics);
            }
            if self.services[..i].iter().any(|s| s.uuid.same_as(&service.uuid)) {
                return Err(RegistrationError::DuplicateService(service.uuid));
            }

            let chars = service.characteristics();
            for (j, characteristic) in chars.iter().enumerate() {
                if chars[..j].iter().any(|c| c.uuid.same_as(&characteristic.uuid)) {
                    return Err(RegistrationError::DuplicateCharacteristic {
                        service: service.uuid,
                        characteristic: characteristic.uuid,
                    });
                }
            }
        }

        Ok(())
    }

    /// Install the services into the stack and freeze the registry.
    ///
    /// Runs the count pass over the whole layout first; the add pass only
    /// starts once the stack has accepted the layout. Any failure aborts.
    pub fn build<S: AttributeStore>(self, store: &mut S) -> Result<Registry<'s>, RegistrationError> {
        self.validate()?;

        let layout = self.layout();
        store.reserve(&layout).map_err(|e| {
            log::error!("GATT: count pass rejected ({:?})", e);
            RegistrationError::Count(e)
        })?;

        let mut handles: Vec<HandleEntry, MAX_CHARACTERISTICS> = Vec::new();
        for (service_index, service) in self.services.iter().enumerate() {
            let installed = store.add_service(service).map_err(|e| {
                log::error!("GATT: installing service {:?} failed ({:?})", service.uuid, e);
                RegistrationError::Install(e)
            })?;

            if installed.values.len() != service.characteristics().len() {
                return Err(RegistrationError::HandleMismatch);
            }

            for (characteristic_index, &value_handle) in installed.values.iter().enumerate() {
                handles
                    .push(HandleEntry {
                        value_handle,
                        service: service_index,
                        characteristic: characteristic_index,
                    })
                    .map_err(|_| RegistrationError::TooManyCharacteristics)?;
            }
        }

        log::info!(
            "GATT: registered {} services, {} characteristics",
            layout.services,
            layout.characteristics
        );

        Ok(Registry {
            services: self.services,
            handles,
        })
    }
}

impl Default for RegistryBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct HandleEntry {
    value_handle: AttributeHandle,
    service: usize,
    characteristic: usize,
}

/// Installed, immutable attribute set
pub struct Registry<'s> {
    services: Vec<Service<'s>, MAX_SERVICES>,
    handles: Vec<HandleEntry, MAX_CHARACTERISTICS>,
}

impl<'s> Registry<'s> {
    pub fn services(&self) -> &[Service<'s>] {
        &self.services
    }

    pub fn layout(&self) -> TableLayout {
        layout_of(&self.services)
    }

    /// Characteristic whose value lives at `handle`
    pub fn find_by_handle(&self, handle: AttributeHandle) -> Option<&Characteristic<'s>> {
        self.handles
            .iter()
            .find(|e| e.value_handle == handle)
            .map(|e| &self.services[e.service].characteristics[e.characteristic])
    }

    /// Value handle of the characteristic identified by `id`
    pub fn value_handle(&self, id: &CharacteristicId) -> Option<AttributeHandle> {
        self.handles
            .iter()
            .find(|e| {
                let service = &self.services[e.service];
                service.uuid.same_as(&id.service)
                    && service.characteristics[e.characteristic]
                        .uuid
                        .same_as(&id.characteristic)
            })
            .map(|e| e.value_handle)
    }

    /// All value handles with their characteristic, in installation order
    pub fn value_handles(&self) -> impl Iterator<Item = (AttributeHandle, &Characteristic<'s>)> + '_ {
        self.handles.iter().map(move |e| {
            (
                e.value_handle,
                &self.services[e.service].characteristics[e.characteristic],
            )
        })
    }
}

fn layout_of(services: &[Service<'_>]) -> TableLayout {
    TableLayout {
        services: services.len(),
        characteristics: services.iter().map(|s| s.characteristics.len()).sum(),
    }
}
