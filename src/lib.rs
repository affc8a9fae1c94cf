#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod gap;
pub mod gatt;

// These modules depend on embassy/async features only available with embedded feature
#[cfg(feature = "embedded")]
pub mod ble;
#[cfg(feature = "embedded")]
pub mod debug;
#[cfg(feature = "embedded")]
pub mod tasks;
