//! Attribute value sources
//!
//! A source produces the current value of one characteristic when a central
//! reads it. Sources run on the BLE host context and must return promptly:
//! anything that talks to a sensor bus has to finish within the read.

use crate::config::gatt::MAX_VALUE_LEN;
use crate::config::heart_rate;
use heapless::Vec;

/// Encoded characteristic value
pub type AttributeValue = Vec<u8, MAX_VALUE_LEN>;

/// Errors a source can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// No reading available (sensor absent or not yet wired up)
    Unavailable,
    /// The encoded reading did not fit in an attribute value
    Overflow,
}

/// Producer of a characteristic value
pub trait ValueSource {
    /// Write the current value into `out`, which is empty on entry
    fn read(&self, out: &mut AttributeValue) -> Result<(), SourceError>;
}

/// Heart Rate Measurement (0x2A37) with a fixed reading
///
/// Layout: `[flags: u8][bpm: u8]`. Flag bit 0 clear means an 8-bit rate;
/// bits 1-2 carry sensor contact status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateMeasurement {
    pub flags: u8,
    pub bpm: u8,
}

impl HeartRateMeasurement {
    /// Stub reading served until a real sensor is attached
    pub const fn fixed() -> Self {
        Self {
            flags: heart_rate::CONTACT_FLAGS,
            bpm: heart_rate::BPM,
        }
    }
}

impl ValueSource for HeartRateMeasurement {
    fn read(&self, out: &mut AttributeValue) -> Result<(), SourceError> {
        out.extend_from_slice(&[self.flags, self.bpm])
            .map_err(|_| SourceError::Overflow)
    }
}

/// Body Sensor Location codes (0x2A38)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLocation {
    Other = 0x00,
    Chest = 0x01,
    Wrist = 0x02,
    Finger = 0x03,
    Hand = 0x04,
    EarLobe = 0x05,
    Foot = 0x06,
}

/// Body Sensor Location with a constant value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySensorLocation(pub SensorLocation);

impl ValueSource for BodySensorLocation {
    fn read(&self, out: &mut AttributeValue) -> Result<(), SourceError> {
        out.push(self.0 as u8).map_err(|_| SourceError::Overflow)
    }
}

/// Source for a characteristic whose sensor integration does not exist yet.
/// Every read reports [`SourceError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

impl ValueSource for UnavailableSource {
    fn read(&self, _out: &mut AttributeValue) -> Result<(), SourceError> {
        Err(SourceError::Unavailable)
    }
}
