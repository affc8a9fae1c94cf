//! GATT read dispatcher
//!
//! Routes attribute reads to the source bound in the registry and appends
//! the produced value to the stack's response buffer. Dispatch holds no
//! state of its own and never modifies the registry.

use crate::gatt::registry::{CharacteristicId, Registry};
use crate::gatt::sources::{AttributeValue, SourceError, ValueSource};
use crate::gatt::traits::AttributeHandle;
use heapless::Vec;

/// Errors returned to the remote reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    /// No readable characteristic value at this handle
    InvalidHandle,
    /// The value could not be produced or did not fit the response
    InsufficientResources,
}

impl AttributeError {
    /// ATT protocol error code
    pub fn att_code(&self) -> u8 {
        match self {
            AttributeError::InvalidHandle => 0x01,
            AttributeError::InsufficientResources => 0x11,
        }
    }
}

/// The response buffer ran out of room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferFull;

/// Outgoing read response buffer provided by the stack
pub trait ResponseBuffer {
    /// Bytes currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `data`
    fn append(&mut self, data: &[u8]) -> Result<(), BufferFull>;

    /// Drop everything after the first `len` bytes
    fn truncate(&mut self, len: usize);
}

impl<const N: usize> ResponseBuffer for Vec<u8, N> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn append(&mut self, data: &[u8]) -> Result<(), BufferFull> {
        self.extend_from_slice(data).map_err(|_| BufferFull)
    }

    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len)
    }
}

/// Serves reads against a built registry
pub struct GattDispatcher<'r, 's> {
    registry: &'r Registry<'s>,
}

impl<'r, 's> GattDispatcher<'r, 's> {
    pub fn new(registry: &'r Registry<'s>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry<'s> {
        self.registry
    }

    /// Serve a read on the value at `handle`.
    ///
    /// Returns the number of bytes appended. On error nothing is left in
    /// `out` beyond what it held on entry.
    pub fn on_read<B: ResponseBuffer>(
        &self,
        handle: AttributeHandle,
        out: &mut B,
    ) -> Result<usize, AttributeError> {
        let characteristic = self
            .registry
            .find_by_handle(handle)
            .ok_or(AttributeError::InvalidHandle)?;

        let result = serve(characteristic.source(), out);
        if let Err(e) = result {
            log::warn!("GATT: read of {:?} failed ({:?})", characteristic.uuid(), e);
        }
        result
    }

    /// Serve a read addressed by (service UUID, characteristic UUID)
    pub fn read<B: ResponseBuffer>(
        &self,
        id: &CharacteristicId,
        out: &mut B,
    ) -> Result<usize, AttributeError> {
        let handle = self
            .registry
            .value_handle(id)
            .ok_or(AttributeError::InvalidHandle)?;
        self.on_read(handle, out)
    }
}

fn serve<B: ResponseBuffer>(source: &dyn ValueSource, out: &mut B) -> Result<usize, AttributeError> {
    let mut value = AttributeValue::new();
    source.read(&mut value).map_err(|e| match e {
        SourceError::Unavailable | SourceError::Overflow => AttributeError::InsufficientResources,
    })?;

    let start = out.len();
    if out.append(&value).is_err() {
        out.truncate(start);
        return Err(AttributeError::InsufficientResources);
    }

    Ok(value.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::registry::{Characteristic, RegistryBuilder, Service};
    use crate::gatt::sources::{BodySensorLocation, HeartRateMeasurement, SensorLocation, UnavailableSource};
    use crate::gatt::traits::mock::MockAttributeStore;
    use crate::gatt::uuid::assigned;

    static HRM: HeartRateMeasurement = HeartRateMeasurement::fixed();
    static LOCATION: BodySensorLocation = BodySensorLocation(SensorLocation::Chest);
    static STUB: UnavailableSource = UnavailableSource;

    const HRM_ID: CharacteristicId =
        CharacteristicId::new(assigned::HEART_RATE_SERVICE, assigned::HEART_RATE_MEASUREMENT);
    const BSL_ID: CharacteristicId =
        CharacteristicId::new(assigned::HEART_RATE_SERVICE, assigned::BODY_SENSOR_LOCATION);
    const TEMP_ID: CharacteristicId =
        CharacteristicId::new(assigned::ENVIRONMENTAL_SENSING_SERVICE, assigned::TEMPERATURE);
    const HUMIDITY_ID: CharacteristicId =
        CharacteristicId::new(assigned::ENVIRONMENTAL_SENSING_SERVICE, assigned::HUMIDITY);

    fn registry() -> Registry<'static> {
        let mut store = MockAttributeStore::new(32);
        RegistryBuilder::new()
            .service(
                Service::new(assigned::HEART_RATE_SERVICE)
                    .with_characteristic(Characteristic::read_only(assigned::HEART_RATE_MEASUREMENT, &HRM))
                    .with_characteristic(Characteristic::read_only(assigned::BODY_SENSOR_LOCATION, &LOCATION)),
            )
            .service(
                Service::new(assigned::ENVIRONMENTAL_SENSING_SERVICE)
                    .with_characteristic(Characteristic::read_only(assigned::TEMPERATURE, &STUB))
                    .with_characteristic(Characteristic::read_only(assigned::HUMIDITY, &STUB)),
            )
            .build(&mut store)
            .unwrap()
    }

    #[test]
    fn test_read_heart_rate_measurement() {
        let registry = registry();
        let dispatcher = GattDispatcher::new(&registry);
        let mut out: Vec<u8, 23> = Vec::new();

        assert_eq!(dispatcher.read(&HRM_ID, &mut out), Ok(2));
        assert_eq!(out.as_slice(), &[0x06, 80]);
    }

    #[test]
    fn test_read_body_sensor_location() {
        let registry = registry();
        let dispatcher = GattDispatcher::new(&registry);
        let mut out: Vec<u8, 23> = Vec::new();

        assert_eq!(dispatcher.read(&BSL_ID, &mut out), Ok(1));
        assert_eq!(out.as_slice(), &[0x01]);
    }

    #[test]
    fn test_read_by_handle_matches_read_by_id() {
        let registry = registry();
        let dispatcher = GattDispatcher::new(&registry);
        let handle = dispatcher.registry().value_handle(&HRM_ID).unwrap();

        let mut by_handle: Vec<u8, 23> = Vec::new();
        let mut by_id: Vec<u8, 23> = Vec::new();
        dispatcher.on_read(handle, &mut by_handle).unwrap();
        dispatcher.read(&HRM_ID, &mut by_id).unwrap();

        assert_eq!(by_handle, by_id);
    }

    #[test]
    fn test_stubbed_sensors_report_insufficient_resources() {
        let registry = registry();
        let dispatcher = GattDispatcher::new(&registry);

        for id in [TEMP_ID, HUMIDITY_ID] {
            let mut out: Vec<u8, 23> = Vec::new();
            assert_eq!(
                dispatcher.read(&id, &mut out),
                Err(AttributeError::InsufficientResources)
            );
            assert!(ResponseBuffer::is_empty(&out));
        }
    }

    #[test]
    fn test_full_buffer_leaves_no_partial_value() {
        let registry = registry();
        let dispatcher = GattDispatcher::new(&registry);

        // room for one of the two HRM bytes
        let mut out: Vec<u8, 2> = Vec::new();
        out.push(0xAA).unwrap();

        assert_eq!(
            dispatcher.read(&HRM_ID, &mut out),
            Err(AttributeError::InsufficientResources)
        );
        assert_eq!(out.as_slice(), &[0xAA]);
    }

    #[test]
    fn test_unknown_handle() {
        let registry = registry();
        let dispatcher = GattDispatcher::new(&registry);
        let mut out: Vec<u8, 23> = Vec::new();

        // handle 1 is the service declaration, not a value
        assert_eq!(dispatcher.on_read(1, &mut out), Err(AttributeError::InvalidHandle));
        assert_eq!(dispatcher.on_read(0x00FF, &mut out), Err(AttributeError::InvalidHandle));
    }

    #[test]
    fn test_att_codes() {
        assert_eq!(AttributeError::InvalidHandle.att_code(), 0x01);
        assert_eq!(AttributeError::InsufficientResources.att_code(), 0x11);
    }
}
