//! Connection indicator LED
//!
//! Lit while a central is connected, dark otherwise. The LED is active low.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embedded_hal::digital::OutputPin;

use crate::gap::slot::SlotState;

/// Type alias for the slot state channel sender
pub type LedSender = Sender<'static, CriticalSectionRawMutex, SlotState, 4>;

/// Type alias for the slot state channel receiver
pub type LedReceiver = Receiver<'static, CriticalSectionRawMutex, SlotState, 4>;

/// Slot state updates for the LED
pub static LED_CHANNEL: Channel<CriticalSectionRawMutex, SlotState, 4> = Channel::new();

/// Task that mirrors the slot state on the LED
pub async fn led_task<P: OutputPin>(mut led: P, receiver: LedReceiver) {
    loop {
        let state = receiver.receive().await;

        let _ = match state {
            SlotState::Connected => led.set_low(),
            SlotState::Advertising | SlotState::Idle => led.set_high(),
        };
    }
}
