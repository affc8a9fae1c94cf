//! GAP stack trait for abstraction and testability
//!
//! The connection state machine drives advertising and consumes connection
//! events through this trait, so the real BLE host can be swapped for a
//! mock in tests.

use crate::config::advertising::{INTERVAL_MAX_MS, INTERVAL_MIN_MS};
use crate::gap::identity::AdvertisedIdentity;
use crate::gap::slot::PeerHandle;
use core::future::Future;

/// Connection lifecycle events delivered by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEvent {
    /// A central connected
    Connected { peer: PeerHandle },
    /// The link dropped, with the HCI reason code
    Disconnected { reason: u8 },
    /// Any other GAP event, identified by its stack-specific code
    Other { code: u8 },
}

/// Codes carried by `GapEvent::Other`, numbered after the HCI LE meta
/// subevent that reports the same condition
pub mod event_code {
    pub const CONNECTION_UPDATE: u8 = 0x03;
    pub const CONNECTION_PARAM_REQUEST: u8 = 0x06;
    pub const DATA_LENGTH_CHANGE: u8 = 0x07;
    pub const PHY_UPDATE: u8 = 0x0C;
    /// Event with no LE meta counterpart
    pub const UNKNOWN: u8 = 0xFF;
}

/// Errors starting advertising
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingError {
    /// Controller already advertising or otherwise busy
    Busy,
    /// Parameters rejected by the controller
    InvalidParameters,
    /// Payload does not fit a legacy advertising PDU
    PayloadTooLarge,
    /// Any other host or controller failure
    Stack,
}

/// Advertising interval bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParams {
    pub interval_min_ms: u32,
    pub interval_max_ms: u32,
}

impl Default for AdvertisingParams {
    fn default() -> Self {
        Self {
            interval_min_ms: INTERVAL_MIN_MS,
            interval_max_ms: INTERVAL_MAX_MS,
        }
    }
}

/// Check a request before it reaches the controller.
///
/// Only connectable advertising is supported.
pub fn check_advertisable(
    identity: &AdvertisedIdentity,
    params: &AdvertisingParams,
) -> Result<(), AdvertisingError> {
    if params.interval_min_ms > params.interval_max_ms || !identity.is_connectable() {
        return Err(AdvertisingError::InvalidParameters);
    }
    Ok(())
}

/// Abstract GAP role of the BLE host
pub trait GapStack {
    /// Begin advertising `identity`.
    ///
    /// Resolves once the controller accepted the request. Connection and
    /// disconnection arrive later through `next_event`.
    fn advertise_start(
        &mut self,
        identity: &AdvertisedIdentity,
        params: &AdvertisingParams,
    ) -> impl Future<Output = Result<(), AdvertisingError>>;

    /// Wait for the next GAP event
    fn next_event(&mut self) -> impl Future<Output = GapEvent>;
}

#[cfg(test)]
pub mod mock {
    //! Mock GAP stack for testing

    use super::*;
    use crate::config::gap::MAX_DEVICE_NAME_LEN;
    use heapless::{Deque, String, Vec};

    /// One recorded advertise_start() call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StartRecord {
        pub name: String<MAX_DEVICE_NAME_LEN>,
        pub connectable: bool,
        pub params: AdvertisingParams,
    }

    /// Mock GAP stack for unit testing
    pub struct MockGapStack {
        /// Events returned by next_event(), oldest first
        events: Deque<GapEvent, 16>,
        /// Errors returned by the next advertise_start() calls, oldest first
        start_errors: Deque<AdvertisingError, 16>,
        /// Every advertise_start() call, failed ones included
        starts: Vec<StartRecord, 32>,
    }

    impl MockGapStack {
        pub fn new() -> Self {
            Self {
                events: Deque::new(),
                start_errors: Deque::new(),
                starts: Vec::new(),
            }
        }

        /// Queue an event for next_event()
        pub fn queue_event(&mut self, event: GapEvent) {
            let _ = self.events.push_back(event);
        }

        /// Fail the next advertise_start() call that has no error queued yet
        pub fn fail_next_start(&mut self, error: AdvertisingError) {
            let _ = self.start_errors.push_back(error);
        }

        pub fn start_count(&self) -> usize {
            self.starts.len()
        }

        pub fn starts(&self) -> &[StartRecord] {
            &self.starts
        }
    }

    impl Default for MockGapStack {
        fn default() -> Self {
            Self::new()
        }
    }

    impl GapStack for MockGapStack {
        async fn advertise_start(
            &mut self,
            identity: &AdvertisedIdentity,
            params: &AdvertisingParams,
        ) -> Result<(), AdvertisingError> {
            let mut name = String::new();
            let _ = name.push_str(identity.name());
            let _ = self.starts.push(StartRecord {
                name,
                connectable: identity.is_connectable(),
                params: *params,
            });

            match self.start_errors.pop_front() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        async fn next_event(&mut self) -> GapEvent {
            match self.events.pop_front() {
                Some(event) => event,
                None => panic!("MockGapStack: no event queued"),
            }
        }
    }
}
