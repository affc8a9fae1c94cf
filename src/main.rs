#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use static_cell::StaticCell;

use hrs_peripheral_firmware::debug;
use hrs_peripheral_firmware::tasks::{self, LedReceiver, LedSender, LED_CHANNEL};

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

#[esp_hal::main]
fn main() -> ! {
    // Initialise heap allocator for BLE support (64KB - BLE requires significant heap)
    esp_alloc::heap_allocator!(size: 64 * 1024);

    debug::init(log::LevelFilter::Info);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // LED off until a central connects (active low)
    let led = Output::new(peripherals.GPIO48, Level::High, OutputConfig::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Static random address from the eFuse MAC, top two bits set
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let address = [mac[5], mac[4], mac[3], mac[2], mac[1], mac[0] | 0xC0];

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller = match esp_radio::init() {
        Ok(controller) => RADIO_CONTROLLER.init(controller),
        Err(_) => halt_blocking("esp-radio init failed"),
    };

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = match esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    ) {
        Ok(connector) => connector,
        Err(_) => halt_blocking("BLE connector init failed"),
    };

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, led, controller, address));
    })
}

/// Park before the executor exists
fn halt_blocking(what: &str) -> ! {
    esp_println::println!("FATAL: {}, halting", what);
    let delay = Delay::new();
    loop {
        delay.delay_millis(1000);
    }
}

#[embassy_executor::task]
async fn async_main(spawner: Spawner, led: Output<'static>, ble_controller: BleController, address: [u8; 6]) {
    spawner.must_spawn(debug_writer_task());
    spawner.must_spawn(led_task(led, LED_CHANNEL.receiver()));
    spawner.must_spawn(ble_host_task(ble_controller, address, LED_CHANNEL.sender()));
}

/// Task that prints queued log records
#[embassy_executor::task]
async fn debug_writer_task() {
    debug::debug_writer_task().await;
}

/// Task that shows the connection state on the LED
#[embassy_executor::task]
async fn led_task(led: Output<'static>, receiver: LedReceiver) {
    tasks::led_task(led, receiver).await;
}

/// Task that manages BLE connectivity
///
/// Registers the GATT services, advertises and serves the connected central.
#[embassy_executor::task]
async fn ble_host_task(controller: BleController, address: [u8; 6], led_sender: LedSender) {
    tasks::ble_task(controller, address, led_sender).await;
    tasks::halt_faulted("BLE host stopped").await;
}
