//! Service and characteristic identifiers
//!
//! Standard attributes use 16-bit aliases from the Bluetooth assigned numbers
//! registry. Vendor attributes use full 128-bit UUIDs. A 16-bit alias expands
//! to 128 bits by placing it in bytes 2..4 of the Bluetooth Base UUID
//! `00000000-0000-1000-8000-00805F9B34FB`.

/// Bluetooth Base UUID, big-endian
const BASE_UUID: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0x80, 0x5F, 0x9B, 0x34, 0xFB,
];

/// A 16- or 128-bit attribute UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleUuid {
    /// Assigned-number alias
    Uuid16(u16),
    /// Full UUID, big-endian byte order
    Uuid128([u8; 16]),
}

impl BleUuid {
    /// Expand to the full 128-bit form (big-endian)
    pub const fn to_uuid128(&self) -> [u8; 16] {
        match *self {
            BleUuid::Uuid16(alias) => {
                let mut full = BASE_UUID;
                let bytes = alias.to_be_bytes();
                full[2] = bytes[0];
                full[3] = bytes[1];
                full
            }
            BleUuid::Uuid128(full) => full,
        }
    }

    /// Compare two UUIDs by their expanded form, so an alias matches its
    /// 128-bit spelling.
    pub fn same_as(&self, other: &BleUuid) -> bool {
        self.to_uuid128() == other.to_uuid128()
    }

    /// The 16-bit alias, if this UUID has one
    pub fn as_uuid16(&self) -> Option<u16> {
        let full = self.to_uuid128();
        let base_matches = full[..2] == BASE_UUID[..2] && full[4..] == BASE_UUID[4..];
        if base_matches {
            Some(u16::from_be_bytes([full[2], full[3]]))
        } else {
            None
        }
    }
}

/// Assigned numbers used by this firmware
pub mod assigned {
    use super::BleUuid;

    /// Heart Rate Service
    pub const HEART_RATE_SERVICE: BleUuid = BleUuid::Uuid16(0x180D);
    /// Heart Rate Measurement characteristic
    pub const HEART_RATE_MEASUREMENT: BleUuid = BleUuid::Uuid16(0x2A37);
    /// Body Sensor Location characteristic
    pub const BODY_SENSOR_LOCATION: BleUuid = BleUuid::Uuid16(0x2A38);

    /// Environmental Sensing Service
    pub const ENVIRONMENTAL_SENSING_SERVICE: BleUuid = BleUuid::Uuid16(0x181A);
    /// Temperature characteristic
    pub const TEMPERATURE: BleUuid = BleUuid::Uuid16(0x2A6E);
    /// Humidity characteristic
    pub const HUMIDITY: BleUuid = BleUuid::Uuid16(0x2A6F);
}
