//! BLE host task
//!
//! Builds the GATT table from the device services, then runs the host stack
//! alongside the connection state machine:
//! 1. Adds the GAP service and installs the registry into the attribute table
//! 2. Starts advertising
//! 3. Feeds every GAP event to the state machine, retrying failed starts
//!    after the machine's backoff delay
//! 4. Publishes each resulting slot state to the LED task

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;
use trouble_host::prelude::*;

use crate::ble::store::{Table, ValueStorage};
use crate::ble::{GattServer, TroubleAttributeStore, TroubleLink};
use crate::config::gap::{CONNECTIONS_MAX, DEVICE_NAME, L2CAP_CHANNELS_MAX};
use crate::config::gatt::{MAX_CHARACTERISTICS, MAX_VALUE_LEN};
use crate::gap::{Advertiser, AdvertisedIdentity, AdvertisingParams, ConnectionStateMachine, RetryPolicy};
use crate::gatt::profile::device_services;
use crate::gatt::GattDispatcher;
use crate::tasks::led::LedSender;

/// Storage behind the characteristic values of the attribute table
static VALUE_STORAGE: StaticCell<[ValueStorage; MAX_CHARACTERISTICS]> = StaticCell::new();

/// Main BLE task
///
/// Returns only if the host runner stops. Registration failures halt here.
pub async fn ble_task<C: Controller>(controller: C, address: [u8; 6], led_sender: LedSender) {
    log::info!("BLE: starting as '{}'", DEVICE_NAME);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack = trouble_host::new(controller, &mut resources).set_random_address(Address::random(address));

    let Host {
        peripheral,
        mut runner,
        ..
    } = stack.build();

    // GAP service first, the registry's handles follow it
    let mut table: Table<'static> = AttributeTable::new();
    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: DEVICE_NAME,
        appearance: &appearance::UNKNOWN,
    });
    if gap.build(&mut table).is_err() {
        crate::tasks::halt_faulted("GAP service rejected").await;
    }

    let storage = VALUE_STORAGE.init([[0u8; MAX_VALUE_LEN]; MAX_CHARACTERISTICS]);
    let registry = {
        let mut store = TroubleAttributeStore::new(&mut table, storage);
        match device_services().build(&mut store) {
            Ok(registry) => registry,
            Err(e) => {
                log::error!("GATT: registration failed ({:?})", e);
                crate::tasks::halt_faulted("service registration failed").await
            }
        }
    };

    let server = GattServer::new(table);
    let mut link = TroubleLink::new(peripheral, &server, GattDispatcher::new(&registry));
    let mut machine = ConnectionStateMachine::new(
        Advertiser::new(AdvertisedIdentity::default(), AdvertisingParams::default()),
        RetryPolicy::default(),
    );

    let host_task = async {
        let state = machine.startup(&mut link).await;
        let _ = led_sender.try_send(state);

        loop {
            let state = match machine.retry_delay_ms() {
                Some(delay_ms) => {
                    let retry = Timer::after(Duration::from_millis(delay_ms as u64));
                    match select(link.next_event(), retry).await {
                        Either::First(event) => machine.handle(&mut link, event).await,
                        Either::Second(()) => machine.retry_advertising(&mut link).await,
                    }
                }
                None => {
                    let event = link.next_event().await;
                    machine.handle(&mut link, event).await
                }
            };

            // LED updates are best effort
            let _ = led_sender.try_send(state);
        }
    };

    if let Either::First(Err(_)) = select(runner.run(), host_task).await {
        log::error!("BLE: host runner stopped");
    }
}
