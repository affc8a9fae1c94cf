//! GAP peripheral role: identity, advertising and the connection slot

pub mod advertiser;
pub mod identity;
pub mod machine;
pub mod slot;
pub mod traits;

pub use advertiser::Advertiser;
pub use identity::{AdvertisedIdentity, ConnectionMode, Discoverability};
pub use machine::{ConnectionStateMachine, RetryPolicy};
pub use slot::{ConnectionSlot, PeerHandle, SlotState};
pub use traits::{AdvertisingError, AdvertisingParams, GapEvent, GapStack};
