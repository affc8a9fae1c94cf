//! Bluetooth Low Energy host glue
//!
//! Adapts the trouble-host stack to the attribute table and GAP traits the
//! registry and the connection state machine are written against.

pub mod link;
pub mod store;

pub use link::{GattServer, TroubleLink};
pub use store::TroubleAttributeStore;
