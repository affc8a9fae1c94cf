//! trouble-host peripheral behind `GapStack`
//!
//! Advertising, accepting the central and serving its GATT reads all happen
//! here. Reads on registry values are answered through the dispatcher; every
//! other attribute (GAP service) is left to the stack.

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Duration;
use trouble_host::prelude::*;

use crate::config::advertising::MAX_ADV_DATA_LEN;
use crate::config::gap::CONNECTIONS_MAX;
use crate::config::gatt::{ATTRIBUTE_TABLE_SIZE, CCCD_TABLE_SIZE};
use crate::gap::identity::AdvertisedIdentity;
use crate::gap::slot::PeerHandle;
use crate::gap::traits::{check_advertisable, event_code, AdvertisingError, AdvertisingParams, GapEvent, GapStack};
use crate::gatt::dispatcher::{AttributeError, GattDispatcher};
use crate::gatt::sources::AttributeValue;

/// HCI reason reported when advertising ended without a usable connection
const CONNECTION_FAILED_TO_ESTABLISH: u8 = 0x3E;

/// GATT server type used by the firmware
pub type GattServer<'d> = AttributeServer<
    'd,
    NoopRawMutex,
    DefaultPacketPool,
    ATTRIBUTE_TABLE_SIZE,
    CCCD_TABLE_SIZE,
    CONNECTIONS_MAX,
>;

pub struct TroubleLink<'a, 'd, 'stack, C: Controller> {
    peripheral: Peripheral<'stack, C, DefaultPacketPool>,
    server: &'a GattServer<'d>,
    dispatcher: GattDispatcher<'a, 'static>,
    advertiser: Option<Advertiser<'stack, C, DefaultPacketPool>>,
    connection: Option<GattConnection<'stack, 'a, DefaultPacketPool>>,
}

impl<'a, 'd, 'stack, C: Controller> TroubleLink<'a, 'd, 'stack, C> {
    pub fn new(
        peripheral: Peripheral<'stack, C, DefaultPacketPool>,
        server: &'a GattServer<'d>,
        dispatcher: GattDispatcher<'a, 'static>,
    ) -> Self {
        Self {
            peripheral,
            server,
            dispatcher,
            advertiser: None,
            connection: None,
        }
    }

    /// Answer one GATT event on the open connection
    fn serve(&self, event: GattEvent<'_, '_, DefaultPacketPool>) {
        match event {
            GattEvent::Read(read_event) => {
                let handle = read_event.handle();
                let mut value = AttributeValue::new();

                match self.dispatcher.on_read(handle, &mut value) {
                    Ok(_) => {
                        if self.server.table().set_raw(handle, &value).is_err() {
                            let _ = read_event.reject(AttErrorCode::INSUFFICIENT_RESOURCES);
                            return;
                        }
                        let _ = read_event.accept();
                    }
                    // not a registry value, the stack answers from its own table
                    Err(AttributeError::InvalidHandle) => {
                        let _ = read_event.accept();
                    }
                    Err(AttributeError::InsufficientResources) => {
                        let _ = read_event.reject(AttErrorCode::INSUFFICIENT_RESOURCES);
                    }
                }
            }
            GattEvent::Write(write_event) => {
                let _ = write_event.accept();
            }
            GattEvent::Other(other_event) => {
                let _ = other_event.accept();
            }
        }
    }
}

impl<C: Controller> GapStack for TroubleLink<'_, '_, '_, C> {
    async fn advertise_start(
        &mut self,
        identity: &AdvertisedIdentity,
        params: &AdvertisingParams,
    ) -> Result<(), AdvertisingError> {
        check_advertisable(identity, params)?;

        // a pending advertiser is replaced, never stacked
        self.advertiser = None;

        let mut adv_data = [0u8; MAX_ADV_DATA_LEN];
        let len = identity.encode_adv_data(&mut adv_data);

        let advertisement = Advertisement::ConnectableScannableUndirected {
            adv_data: &adv_data[..len],
            scan_data: &[],
        };

        let parameters = AdvertisementParameters {
            interval_min: Duration::from_millis(params.interval_min_ms as u64),
            interval_max: Duration::from_millis(params.interval_max_ms as u64),
            ..Default::default()
        };

        match self.peripheral.advertise(&parameters, advertisement).await {
            Ok(advertiser) => {
                self.advertiser = Some(advertiser);
                Ok(())
            }
            Err(BleHostError::BleHost(Error::Busy)) => Err(AdvertisingError::Busy),
            Err(BleHostError::BleHost(Error::InsufficientSpace)) => {
                Err(AdvertisingError::PayloadTooLarge)
            }
            Err(_) => Err(AdvertisingError::Stack),
        }
    }

    async fn next_event(&mut self) -> GapEvent {
        loop {
            if let Some(conn) = &self.connection {
                match conn.next().await {
                    GattConnectionEvent::Disconnected { reason } => {
                        self.connection = None;
                        return GapEvent::Disconnected {
                            reason: reason.into_inner(),
                        };
                    }
                    GattConnectionEvent::Gatt { event } => self.serve(event),
                    GattConnectionEvent::PhyUpdated { .. } => {
                        return GapEvent::Other {
                            code: event_code::PHY_UPDATE,
                        }
                    }
                    GattConnectionEvent::ConnectionParamsUpdated { .. } => {
                        return GapEvent::Other {
                            code: event_code::CONNECTION_UPDATE,
                        }
                    }
                    GattConnectionEvent::RequestConnectionParams { .. } => {
                        return GapEvent::Other {
                            code: event_code::CONNECTION_PARAM_REQUEST,
                        }
                    }
                    GattConnectionEvent::DataLengthUpdated { .. } => {
                        return GapEvent::Other {
                            code: event_code::DATA_LENGTH_CHANGE,
                        }
                    }
                    #[allow(unreachable_patterns)]
                    _ => {
                        return GapEvent::Other {
                            code: event_code::UNKNOWN,
                        }
                    }
                }
                continue;
            }

            let Some(advertiser) = self.advertiser.take() else {
                // nothing to wait for until advertising restarts
                return core::future::pending().await;
            };

            let acceptor = match advertiser.accept().await {
                Ok(acceptor) => acceptor,
                Err(_) => {
                    return GapEvent::Disconnected {
                        reason: CONNECTION_FAILED_TO_ESTABLISH,
                    }
                }
            };

            let peer = PeerHandle(acceptor.handle().raw());
            match acceptor.with_attribute_server(self.server) {
                Ok(conn) => {
                    self.connection = Some(conn);
                    return GapEvent::Connected { peer };
                }
                Err(_) => {
                    log::warn!("BLE: can't attach GATT server to peer {}", peer.0);
                    return GapEvent::Disconnected {
                        reason: CONNECTION_FAILED_TO_ESTABLISH,
                    };
                }
            }
        }
    }
}

