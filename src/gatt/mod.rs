//! GATT service registry and read dispatch

pub mod dispatcher;
pub mod profile;
pub mod registry;
pub mod sources;
pub mod traits;
pub mod uuid;

pub use dispatcher::{AttributeError, GattDispatcher, ResponseBuffer};
pub use registry::{Characteristic, CharacteristicId, Registry, RegistrationError, RegistryBuilder, Service};
pub use sources::{AttributeValue, SourceError, ValueSource};
pub use traits::{AttributeHandle, AttributeStore, ServiceHandles, StackError, TableLayout};
pub use uuid::BleUuid;
