//! Embassy tasks module
//!
//! Contains all async tasks for the firmware, organised by functionality.

pub mod ble;
pub mod led;

pub use ble::ble_task;
pub use led::{led_task, LedReceiver, LedSender, LED_CHANNEL};

use embassy_time::{Duration, Timer};

/// Park forever after an unrecoverable startup error
pub async fn halt_faulted(what: &str) -> ! {
    log::error!("FATAL: {}, halting", what);
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}
