//! Connection state machine
//!
//! Owns the single connection slot and reacts to GAP events:
//!
//! ```text
//!  Idle --startup--> Advertising --connect--> Connected
//!   ^                    ^                        |
//!   |                    +-------disconnect-------+
//!   +--start failed--+
//! ```
//!
//! A disconnect from any state makes exactly one advertising start. When a
//! start fails the slot drops to `Idle` and a retry is armed with exponential
//! backoff; the owner polls `retry_delay_ms()` and calls
//! `retry_advertising()` once it elapses.

use crate::config::advertising::{RETRY_ALARM_AFTER, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_MS};
use crate::gap::advertiser::Advertiser;
use crate::gap::slot::{ConnectionSlot, SlotState};
use crate::gap::traits::{GapEvent, GapStack};

/// Backoff applied after failed advertising starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay_ms: u32,
    pub max_delay_ms: u32,
    /// Consecutive failures before the device is reported undiscoverable
    pub alarm_after: u8,
}

impl RetryPolicy {
    /// Delay before the retry following `failures` consecutive failures
    pub fn delay_ms(&self, failures: u8) -> u32 {
        let mut delay = self.base_delay_ms;
        for _ in 1..failures {
            if delay >= self.max_delay_ms {
                break;
            }
            delay = delay.saturating_mul(2);
        }
        delay.min(self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: RETRY_BASE_DELAY_MS,
            max_delay_ms: RETRY_MAX_DELAY_MS,
            alarm_after: RETRY_ALARM_AFTER,
        }
    }
}

pub struct ConnectionStateMachine {
    slot: ConnectionSlot,
    advertiser: Advertiser,
    policy: RetryPolicy,
    failures: u8,
    alarm_raised: bool,
}

impl ConnectionStateMachine {
    pub fn new(advertiser: Advertiser, policy: RetryPolicy) -> Self {
        Self {
            slot: ConnectionSlot::new(),
            advertiser,
            policy,
            failures: 0,
            alarm_raised: false,
        }
    }

    pub fn slot(&self) -> &ConnectionSlot {
        &self.slot
    }

    pub fn state(&self) -> SlotState {
        self.slot.state()
    }

    pub fn advertiser(&self) -> &Advertiser {
        &self.advertiser
    }

    /// Consecutive failed advertising starts
    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// True once failures reached the alarm threshold, until the next success
    pub fn advertising_alarm(&self) -> bool {
        self.alarm_raised
    }

    /// Begin advertising once the stack is synchronised
    pub async fn startup<S: GapStack>(&mut self, stack: &mut S) -> SlotState {
        if self.slot.state() != SlotState::Idle {
            log::warn!("GAP: startup in {:?}, ignored", self.slot.state());
            return self.slot.state();
        }
        self.enter_advertising(stack).await
    }

    /// Apply one stack event and return the resulting state
    pub async fn handle<S: GapStack>(&mut self, stack: &mut S, event: GapEvent) -> SlotState {
        match event {
            GapEvent::Connected { peer } => {
                match self.slot.connect(peer) {
                    Ok(()) => log::info!("GAP: connected, peer {}", peer.0),
                    Err(Some(current)) => log::warn!(
                        "GAP: connect from peer {} while serving peer {}, ignored",
                        peer.0,
                        current.0
                    ),
                    Err(None) => log::warn!(
                        "GAP: connect from peer {} in {:?}, ignored",
                        peer.0,
                        self.slot.state()
                    ),
                }
                self.slot.state()
            }
            GapEvent::Disconnected { reason } => {
                log::info!("GAP: disconnected, reason 0x{:02X}", reason);
                self.enter_advertising(stack).await
            }
            GapEvent::Other { code } => {
                log::info!("GAP: event 0x{:02X}", code);
                self.slot.state()
            }
        }
    }

    /// Delay before the next advertising attempt, if one is pending
    pub fn retry_delay_ms(&self) -> Option<u32> {
        if self.slot.state() == SlotState::Idle && self.failures > 0 {
            Some(self.policy.delay_ms(self.failures))
        } else {
            None
        }
    }

    /// Retry a failed advertising start. No-op unless a retry is pending.
    pub async fn retry_advertising<S: GapStack>(&mut self, stack: &mut S) -> SlotState {
        if self.retry_delay_ms().is_none() {
            return self.slot.state();
        }
        log::info!("GAP: retrying advertising, attempt {}", self.failures as u32 + 1);
        self.enter_advertising(stack).await
    }

    async fn enter_advertising<S: GapStack>(&mut self, stack: &mut S) -> SlotState {
        self.slot.set_advertising();

        match self.advertiser.start(stack).await {
            Ok(()) => {
                self.failures = 0;
                self.alarm_raised = false;
            }
            Err(_) => {
                self.slot.set_idle();
                self.failures = self.failures.saturating_add(1);
                if self.failures >= self.policy.alarm_after && !self.alarm_raised {
                    log::error!(
                        "GAP: advertising failed {} times, device is undiscoverable",
                        self.failures
                    );
                    self.alarm_raised = true;
                }
            }
        }

        self.slot.state()
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new(Advertiser::default(), RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap::slot::PeerHandle;
    use crate::gap::traits::mock::MockGapStack;
    use crate::gap::traits::{event_code, AdvertisingError};
    use futures::executor::block_on;

    fn started() -> (ConnectionStateMachine, MockGapStack) {
        let mut machine = ConnectionStateMachine::default();
        let mut stack = MockGapStack::new();
        assert_eq!(block_on(machine.startup(&mut stack)), SlotState::Advertising);
        (machine, stack)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let machine = ConnectionStateMachine::default();
        assert_eq!(machine.state(), SlotState::Idle);
        assert_eq!(machine.slot().peer(), None);
    }

    #[test]
    fn test_startup_advertises_once() {
        let (machine, stack) = started();
        assert_eq!(machine.state(), SlotState::Advertising);
        assert_eq!(stack.start_count(), 1);
    }

    #[test]
    fn test_connect_disconnect_cycle() {
        let (mut machine, mut stack) = started();

        let state = block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(7) }));
        assert_eq!(state, SlotState::Connected);
        assert_eq!(machine.slot().peer(), Some(PeerHandle(7)));

        let state = block_on(machine.handle(&mut stack, GapEvent::Disconnected { reason: 0x13 }));
        assert_eq!(state, SlotState::Advertising);
        assert_eq!(machine.slot().peer(), None);
        assert_eq!(stack.start_count(), 2);
    }

    #[test]
    fn test_second_connect_keeps_first_peer() {
        let (mut machine, mut stack) = started();
        block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(1) }));

        let state = block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(2) }));
        assert_eq!(state, SlotState::Connected);
        assert_eq!(machine.slot().peer(), Some(PeerHandle(1)));
        assert_eq!(stack.start_count(), 1);
    }

    #[test]
    fn test_connect_while_idle_is_ignored() {
        let mut machine = ConnectionStateMachine::default();
        let mut stack = MockGapStack::new();

        let state = block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(3) }));
        assert_eq!(state, SlotState::Idle);
        assert_eq!(machine.slot().peer(), None);
    }

    #[test]
    fn test_disconnect_from_any_state_restarts_advertising_once() {
        let mut machine = ConnectionStateMachine::default();
        let mut stack = MockGapStack::new();

        // from Idle
        block_on(machine.handle(&mut stack, GapEvent::Disconnected { reason: 0x08 }));
        assert_eq!(machine.state(), SlotState::Advertising);
        assert_eq!(stack.start_count(), 1);

        // from Advertising
        block_on(machine.handle(&mut stack, GapEvent::Disconnected { reason: 0x08 }));
        assert_eq!(machine.state(), SlotState::Advertising);
        assert_eq!(stack.start_count(), 2);
    }

    #[test]
    fn test_other_events_change_nothing() {
        let (mut machine, mut stack) = started();
        block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(4) }));

        let state = block_on(machine.handle(&mut stack, GapEvent::Other { code: 0x22 }));
        assert_eq!(state, SlotState::Connected);
        assert_eq!(machine.slot().peer(), Some(PeerHandle(4)));
        assert_eq!(stack.start_count(), 1);
    }

    #[test]
    fn test_link_updates_leave_connection_untouched() {
        let (mut machine, mut stack) = started();
        block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(5) }));

        for code in [
            event_code::PHY_UPDATE,
            event_code::CONNECTION_UPDATE,
            event_code::CONNECTION_PARAM_REQUEST,
            event_code::DATA_LENGTH_CHANGE,
            event_code::UNKNOWN,
        ] {
            let state = block_on(machine.handle(&mut stack, GapEvent::Other { code }));
            assert_eq!(state, SlotState::Connected);
            assert_eq!(machine.slot().peer(), Some(PeerHandle(5)));
        }
        assert_eq!(stack.start_count(), 1);
        assert_eq!(machine.retry_delay_ms(), None);
    }

    #[test]
    fn test_restarts_use_configured_identity() {
        let (mut machine, mut stack) = started();
        block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(2) }));
        block_on(machine.handle(&mut stack, GapEvent::Disconnected { reason: 0x13 }));

        let advertiser = machine.advertiser();
        for start in stack.starts() {
            assert_eq!(start.name.as_str(), advertiser.identity().name());
            assert_eq!(start.params, *advertiser.params());
        }
        assert_eq!(stack.start_count(), 2);
    }

    #[test]
    fn test_failed_restart_after_disconnect_goes_idle() {
        let (mut machine, mut stack) = started();
        block_on(machine.handle(&mut stack, GapEvent::Connected { peer: PeerHandle(7) }));
        stack.fail_next_start(AdvertisingError::Busy);

        let state = block_on(machine.handle(&mut stack, GapEvent::Disconnected { reason: 0x13 }));
        assert_eq!(state, SlotState::Idle);
        assert_eq!(machine.slot().peer(), None);
        assert_eq!(stack.start_count(), 2);
        assert_eq!(machine.retry_delay_ms(), Some(RETRY_BASE_DELAY_MS));
    }

    #[test]
    fn test_retry_recovers_and_resets_backoff() {
        let mut machine = ConnectionStateMachine::default();
        let mut stack = MockGapStack::new();
        stack.fail_next_start(AdvertisingError::Stack);
        stack.fail_next_start(AdvertisingError::Stack);

        assert_eq!(block_on(machine.startup(&mut stack)), SlotState::Idle);
        assert_eq!(block_on(machine.retry_advertising(&mut stack)), SlotState::Idle);
        assert_eq!(machine.retry_delay_ms(), Some(RETRY_BASE_DELAY_MS * 2));

        assert_eq!(block_on(machine.retry_advertising(&mut stack)), SlotState::Advertising);
        assert_eq!(machine.failures(), 0);
        assert_eq!(machine.retry_delay_ms(), None);
        assert_eq!(stack.start_count(), 3);
    }

    #[test]
    fn test_retry_without_pending_failure_is_noop() {
        let (mut machine, mut stack) = started();
        assert_eq!(block_on(machine.retry_advertising(&mut stack)), SlotState::Advertising);
        assert_eq!(stack.start_count(), 1);
    }

    #[test]
    fn test_alarm_after_repeated_failures() {
        let mut machine = ConnectionStateMachine::default();
        let mut stack = MockGapStack::new();
        for _ in 0..RETRY_ALARM_AFTER {
            stack.fail_next_start(AdvertisingError::Stack);
        }

        block_on(machine.startup(&mut stack));
        for _ in 1..RETRY_ALARM_AFTER {
            assert!(!machine.advertising_alarm());
            block_on(machine.retry_advertising(&mut stack));
        }
        assert!(machine.advertising_alarm());

        block_on(machine.retry_advertising(&mut stack));
        assert_eq!(machine.state(), SlotState::Advertising);
        assert!(!machine.advertising_alarm());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay_ms: 250,
            max_delay_ms: 8000,
            alarm_after: 5,
        };
        assert_eq!(policy.delay_ms(1), 250);
        assert_eq!(policy.delay_ms(2), 500);
        assert_eq!(policy.delay_ms(5), 4000);
        assert_eq!(policy.delay_ms(6), 8000);
        assert_eq!(policy.delay_ms(200), 8000);
    }
}
