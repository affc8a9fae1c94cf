//! BLE client for reading the heart-rate peripheral over GATT.

use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use uuid::Uuid;

/// Expand a 16-bit assigned number into the Bluetooth Base UUID
pub const fn uuid16(alias: u16) -> Uuid {
    Uuid::from_u128(((alias as u128) << 96) | 0x0000_0000_0000_1000_8000_00805f9b34fb)
}

pub const HEART_RATE_SERVICE: Uuid = uuid16(0x180D);
pub const HEART_RATE_MEASUREMENT: Uuid = uuid16(0x2A37);
pub const BODY_SENSOR_LOCATION: Uuid = uuid16(0x2A38);
pub const ENVIRONMENTAL_SENSING_SERVICE: Uuid = uuid16(0x181A);
pub const TEMPERATURE: Uuid = uuid16(0x2A6E);
pub const HUMIDITY: Uuid = uuid16(0x2A6F);

/// Connected client for one device.
pub struct HrsClient {
    adapter: Adapter,
    peripheral: Peripheral,
}

impl HrsClient {
    /// Scan for a device by name and connect.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        let peripheral = Self::scan_and_connect(&adapter, name, scan_timeout).await?;

        Ok(Self { adapter, peripheral })
    }

    async fn scan_and_connect(adapter: &Adapter, name: &str, scan_timeout: Duration) -> Result<Peripheral> {
        adapter.start_scan(ScanFilter::default()).await?;
        let found = Self::find_device_by_name(adapter, name, scan_timeout).await;
        adapter.stop_scan().await?;
        let peripheral = found?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        Ok(peripheral)
    }

    /// Find a device by name within the scan timeout.
    async fn find_device_by_name(adapter: &Adapter, name: &str, scan_timeout: Duration) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                let local_name = peripheral.properties().await?.and_then(|p| p.local_name);
                if local_name.as_deref() == Some(name) {
                    return Ok(peripheral);
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Drop the link, wait for the device to advertise again and reconnect.
    pub async fn reconnect(&mut self, name: &str, scan_timeout: Duration) -> Result<()> {
        self.disconnect().await?;

        // let the peripheral notice the disconnect and restart advertising
        tokio::time::sleep(Duration::from_millis(500)).await;

        self.peripheral = Self::scan_and_connect(&self.adapter, name, scan_timeout).await?;
        Ok(())
    }

    pub async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral.is_connected().await?)
    }

    /// UUIDs of the discovered primary services
    pub fn services(&self) -> Vec<Uuid> {
        self.peripheral.services().iter().map(|s| s.uuid).collect()
    }

    fn characteristic(&self, service: Uuid, uuid: Uuid) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == uuid)
            .ok_or_else(|| anyhow!("Characteristic {} not found in service {}", uuid, service))
    }

    /// Read a characteristic value.
    pub async fn read(&self, service: Uuid, uuid: Uuid, read_timeout: Duration) -> Result<Vec<u8>> {
        let characteristic = self.characteristic(service, uuid)?;
        match tokio::time::timeout(read_timeout, self.peripheral.read(&characteristic)).await {
            Ok(value) => Ok(value?),
            Err(_) => Err(anyhow!("Timeout reading {}", uuid)),
        }
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
