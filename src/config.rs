//! Build-time configuration for the heart-rate peripheral on an ESP32-S3

/// LED pin
pub mod led {
    pub const PIN: u8 = 48;
}

/// GAP identity
pub mod gap {
    /// Name advertised and exposed through the GAP Device Name characteristic
    pub const DEVICE_NAME: &str = "HRS-Peripheral";

    /// Longest device name we accept (GAP allows more, the legacy payload does not)
    pub const MAX_DEVICE_NAME_LEN: usize = 29;

    /// Maximum concurrent connections (single central)
    pub const CONNECTIONS_MAX: usize = 1;

    /// Number of L2CAP channels
    pub const L2CAP_CHANNELS_MAX: usize = 3;
}

/// Advertising parameters and restart policy
pub mod advertising {
    /// Legacy advertising payload size
    pub const MAX_ADV_DATA_LEN: usize = 31;

    /// Advertising interval in milliseconds
    pub const INTERVAL_MIN_MS: u32 = 100;
    pub const INTERVAL_MAX_MS: u32 = 200;

    /// First retry delay after a failed advertise start
    pub const RETRY_BASE_DELAY_MS: u32 = 250;

    /// Upper bound for the exponential retry delay
    pub const RETRY_MAX_DELAY_MS: u32 = 8_000;

    /// Consecutive failures before the undiscoverable alarm is raised
    pub const RETRY_ALARM_AFTER: u8 = 5;
}

/// GATT table sizing
pub mod gatt {
    /// Maximum number of services in the registry
    pub const MAX_SERVICES: usize = 4;

    /// Maximum number of characteristics per service
    pub const MAX_CHARACTERISTICS_PER_SERVICE: usize = 4;

    /// Maximum number of characteristics across the whole registry
    pub const MAX_CHARACTERISTICS: usize = 8;

    /// Largest characteristic value a source may produce
    pub const MAX_VALUE_LEN: usize = 20;

    /// Attribute table size handed to the host stack
    pub const ATTRIBUTE_TABLE_SIZE: usize = 32;

    /// Attributes consumed by the GAP service (service, name, appearance)
    pub const GAP_ATTRIBUTES: usize = 5;

    /// Client characteristic configuration slots
    pub const CCCD_TABLE_SIZE: usize = 4;
}

/// Fixed heart-rate values served until a real sensor is attached
pub mod heart_rate {
    /// Sensor contact supported and detected (bits 1 and 2)
    pub const CONTACT_FLAGS: u8 = 0x06;

    /// Reported rate in beats per minute
    pub const BPM: u8 = 80;
}
