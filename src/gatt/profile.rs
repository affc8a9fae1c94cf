//! The device's attribute set
//!
//! Heart Rate Service with a fixed measurement and a chest location. With the
//! `environmental-sensing` feature the Environmental Sensing Service is added;
//! its temperature and humidity sources are not wired to a sensor yet and
//! fail every read.

use crate::gatt::registry::{Characteristic, RegistryBuilder, Service};
use crate::gatt::sources::{BodySensorLocation, HeartRateMeasurement, SensorLocation};
use crate::gatt::uuid::assigned;

static HEART_RATE: HeartRateMeasurement = HeartRateMeasurement::fixed();
static SENSOR_LOCATION: BodySensorLocation = BodySensorLocation(SensorLocation::Chest);

#[cfg(feature = "environmental-sensing")]
static TEMPERATURE: crate::gatt::sources::UnavailableSource = crate::gatt::sources::UnavailableSource;
#[cfg(feature = "environmental-sensing")]
static HUMIDITY: crate::gatt::sources::UnavailableSource = crate::gatt::sources::UnavailableSource;

/// Heart Rate Service (0x180D)
pub fn heart_rate_service() -> Service<'static> {
    Service::new(assigned::HEART_RATE_SERVICE)
        .with_characteristic(Characteristic::read_only(assigned::HEART_RATE_MEASUREMENT, &HEART_RATE))
        .with_characteristic(Characteristic::read_only(assigned::BODY_SENSOR_LOCATION, &SENSOR_LOCATION))
}

/// Environmental Sensing Service (0x181A)
#[cfg(feature = "environmental-sensing")]
pub fn environmental_sensing_service() -> Service<'static> {
    Service::new(assigned::ENVIRONMENTAL_SENSING_SERVICE)
        .with_characteristic(Characteristic::read_only(assigned::TEMPERATURE, &TEMPERATURE))
        .with_characteristic(Characteristic::read_only(assigned::HUMIDITY, &HUMIDITY))
}

/// All services of this firmware, ready to be built
pub fn device_services() -> RegistryBuilder<'static> {
    let builder = RegistryBuilder::new().service(heart_rate_service());

    #[cfg(feature = "environmental-sensing")]
    let builder = builder.service(environmental_sensing_service());

    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::dispatcher::GattDispatcher;
    use crate::gatt::registry::CharacteristicId;
    use crate::gatt::traits::mock::MockAttributeStore;
    use heapless::Vec;

    #[test]
    fn test_heart_rate_service_shape() {
        let service = heart_rate_service();
        let uuids: Vec<_, 4> = service.characteristics().iter().map(|c| c.uuid()).collect();

        assert_eq!(service.uuid(), assigned::HEART_RATE_SERVICE);
        assert_eq!(
            uuids.as_slice(),
            &[assigned::HEART_RATE_MEASUREMENT, assigned::BODY_SENSOR_LOCATION]
        );
    }

    #[test]
    fn test_device_services_fit_attribute_table() {
        use crate::config::gatt::{ATTRIBUTE_TABLE_SIZE, GAP_ATTRIBUTES};

        let layout = device_services().layout();
        assert!(layout.attributes() <= ATTRIBUTE_TABLE_SIZE - GAP_ATTRIBUTES);
    }

    #[test]
    fn test_device_registry_serves_heart_rate() {
        let mut store = MockAttributeStore::new(32);
        let registry = device_services().build(&mut store).unwrap();
        let dispatcher = GattDispatcher::new(&registry);

        let mut out: Vec<u8, 23> = Vec::new();
        let id = CharacteristicId::new(assigned::HEART_RATE_SERVICE, assigned::HEART_RATE_MEASUREMENT);
        dispatcher.read(&id, &mut out).unwrap();
        assert_eq!(out.as_slice(), &[0x06, 80]);
    }
}
