//! Debug logging via esp-println.
//!
//! Installs a `log` sink that never blocks the caller. Records are formatted
//! into a small queue and printed by `debug_writer_task`; when the queue is
//! full new records are dropped.

use core::cell::RefCell;
use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::{Deque, String};
use log::{LevelFilter, Log, Metadata, Record};

/// Maximum length of a single debug message
const MAX_DEBUG_MSG_LEN: usize = 160;

/// Messages held until the writer task catches up
const DEBUG_QUEUE_LEN: usize = 8;

type DebugMessage = String<MAX_DEBUG_MSG_LEN>;

/// Signal to indicate debug output is available
pub static DEBUG_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Pending debug messages (protected by critical section mutex)
static DEBUG_QUEUE: Mutex<CriticalSectionRawMutex, RefCell<Deque<DebugMessage, DEBUG_QUEUE_LEN>>> =
    Mutex::new(RefCell::new(Deque::new()));

struct DebugLogger;

static LOGGER: DebugLogger = DebugLogger;

impl Log for DebugLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut msg = DebugMessage::new();
        // truncated records are still worth printing
        let _ = write!(msg, "[{}] {}", record.level(), record.args());
        write_debug(msg);
    }

    fn flush(&self) {}
}

/// Install the logger.
///
/// Must be called once during startup before any task logs.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Queue a message for the writer task. Returns false if it was dropped.
fn write_debug(msg: DebugMessage) -> bool {
    let queued = DEBUG_QUEUE.lock(|cell| cell.borrow_mut().push_back(msg).is_ok());
    DEBUG_SIGNAL.signal(());
    queued
}

/// Take the oldest queued message
fn take_debug_message() -> Option<DebugMessage> {
    DEBUG_QUEUE.lock(|cell| cell.borrow_mut().pop_front())
}

/// Debug writer task that prints queued messages.
pub async fn debug_writer_task() {
    loop {
        DEBUG_SIGNAL.wait().await;

        while let Some(msg) = take_debug_message() {
            esp_println::println!("{}", msg);
        }
    }
}
