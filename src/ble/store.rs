//! trouble-host attribute table behind `AttributeStore`

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use heapless::Vec;
use trouble_host::prelude::*;

use crate::config::gatt::{ATTRIBUTE_TABLE_SIZE, GAP_ATTRIBUTES, MAX_VALUE_LEN};
use crate::gatt::registry::Service as RegistryService;
use crate::gatt::sources::AttributeValue;
use crate::gatt::traits::{AttributeStore, ServiceHandles, StackError, TableLayout};
use crate::gatt::uuid::BleUuid;

/// Backing storage for one characteristic value
pub type ValueStorage = [u8; MAX_VALUE_LEN];

/// Attribute table of the GATT server
pub type Table<'d> = AttributeTable<'d, NoopRawMutex, ATTRIBUTE_TABLE_SIZE>;

impl From<BleUuid> for Uuid {
    fn from(uuid: BleUuid) -> Self {
        match uuid.as_uuid16() {
            Some(alias) => Uuid::new_short(alias),
            None => {
                // trouble stores 128-bit UUIDs little-endian
                let mut le = uuid.to_uuid128();
                le.reverse();
                Uuid::new_long(le)
            }
        }
    }
}

/// Installs registry services into a trouble-host attribute table.
///
/// The GAP service must already be in the table; its attributes are counted
/// against the capacity.
pub struct TroubleAttributeStore<'t, 'd> {
    table: &'t mut Table<'d>,
    storage: core::slice::IterMut<'d, ValueStorage>,
    used: usize,
    reserved: Option<usize>,
    installed: usize,
}

impl<'t, 'd> TroubleAttributeStore<'t, 'd> {
    pub fn new(table: &'t mut Table<'d>, storage: &'d mut [ValueStorage]) -> Self {
        Self {
            table,
            storage: storage.iter_mut(),
            used: GAP_ATTRIBUTES,
            reserved: None,
            installed: 0,
        }
    }
}

impl AttributeStore for TroubleAttributeStore<'_, '_> {
    fn reserve(&mut self, layout: &TableLayout) -> Result<(), StackError> {
        if self.installed > 0 {
            return Err(StackError::AlreadyStarted);
        }
        if self.used + layout.attributes() > ATTRIBUTE_TABLE_SIZE
            || layout.characteristics > self.storage.len()
        {
            return Err(StackError::NoMemory);
        }

        self.reserved = Some(layout.attributes());
        Ok(())
    }

    fn add_service(&mut self, service: &RegistryService<'_>) -> Result<ServiceHandles, StackError> {
        let needed = 1 + 2 * service.characteristics().len();
        match self.reserved {
            Some(reserved) if self.installed + needed <= reserved => {}
            _ => return Err(StackError::NoMemory),
        }

        let mut values = Vec::new();
        let mut builder = self.table.add_service(Service::new(Uuid::from(service.uuid())));

        for characteristic in service.characteristics() {
            let store = self.storage.next().ok_or(StackError::NoMemory)?;
            let installed = builder
                .add_characteristic(
                    Uuid::from(characteristic.uuid()),
                    &[CharacteristicProp::Read],
                    AttributeValue::new(),
                    &mut store[..],
                )
                .build();
            values
                .push(installed.handle)
                .map_err(|_| StackError::InvalidDefinition)?;
        }

        let handle = builder.build();
        self.installed += needed;
        self.used += needed;

        Ok(ServiceHandles {
            service: handle,
            values,
        })
    }
}
