//! NimBLE GATT server.
//!
//! # GATT Layout
//!
//! ```text
//! Service: Counter (12345678-…-123456789abc)
//! └── Counter (Read, Write, Notify, Indicate) - "Count: N"
//!
//! Service: Environmental Sensing (0x181A)
//! ├── Temperature (0x2A6E, Read, Notify) - i16 LE, value × 100
//! ├── Max Temperature (Read, Notify) - i16 LE, value × 100
//! ├── Min Temperature (Read, Notify) - i16 LE, value × 100
//! └── Unit Config (Read, Write) - 0 = Celsius, 1 = Fahrenheit
//! ```
//!
//! Pairing uses a fixed passkey with bonding, MITM protection and secure
//! connections. Stack callbacks only enqueue [`LinkEvent`]s.

use super::transport::{EventInbox, LinkError, LinkEvent, LinkTransport, SensorPayload};
use crate::config::{
    BLE_PASSKEY, COUNTER_CHAR_UUID, COUNTER_INITIAL_VALUE, COUNTER_SERVICE_UUID, DEVICE_NAME,
    ENV_SENSING_SERVICE_UUID16, TEMPERATURE_CHAR_UUID16, TEMP_CONFIG_CHAR_UUID,
    TEMP_MAX_CHAR_UUID, TEMP_MIN_CHAR_UUID,
};
use crate::sensor::TemperatureUnit;
use esp32_nimble::enums::{AuthReq, SecurityIOCap};
use esp32_nimble::utilities::mutex::Mutex;
use esp32_nimble::utilities::BleUuid;
use esp32_nimble::{
    uuid128, BLEAdvertisementData, BLECharacteristic, BLEDevice, NimbleProperties,
};
use log::{info, warn};
use std::sync::Arc;

/// Counter service. Same value as [`COUNTER_SERVICE_UUID`].
const COUNTER_SERVICE: BleUuid = uuid128!("12345678-1234-1234-1234-123456789abc");

/// Counter characteristic. Same value as [`COUNTER_CHAR_UUID`].
const COUNTER_CHAR: BleUuid = uuid128!("87654321-4321-4321-4321-cba987654321");

// Mirrors of the TEMP_*_CHAR_UUID config strings
const TEMP_MAX_CHAR: BleUuid = uuid128!("6e400002-b5a3-f393-e0a9-e50e24dcca9e");
const TEMP_MIN_CHAR: BleUuid = uuid128!("6e400003-b5a3-f393-e0a9-e50e24dcca9e");
const TEMP_CONFIG_CHAR: BleUuid = uuid128!("6e400004-b5a3-f393-e0a9-e50e24dcca9e");

type Characteristic = Arc<Mutex<BLECharacteristic>>;

/// Running GATT server with the counter and environmental sensing services.
pub struct GattServer {
    counter: Characteristic,
    temperature: Characteristic,
    temp_max: Characteristic,
    temp_min: Characteristic,
    inbox: EventInbox,
}

impl GattServer {
    /// Bring up the stack, register services and start advertising.
    pub fn start(unit: TemperatureUnit) -> Result<Self, LinkError> {
        info!("Starting BLE work!");

        let device = BLEDevice::take();
        BLEDevice::set_device_name(DEVICE_NAME)?;
        device
            .security()
            .set_auth(AuthReq::all())
            .set_passkey(BLE_PASSKEY)
            .set_io_cap(SecurityIOCap::DisplayOnly);

        let advertising = device.get_advertising();
        let server = device.get_server();
        // Resume is scheduled by the link manager
        server.advertise_on_disconnect(false);

        let inbox = EventInbox::new();

        let connect_inbox = inbox.clone();
        server.on_connect(move |server, desc| {
            info!("Client connected: {:?}", desc.address());
            connect_inbox.push(LinkEvent::Attached);

            // Keep advertising so further centrals can connect
            if server.connected_count() < (esp_idf_sys::CONFIG_BT_NIMBLE_MAX_CONNECTIONS as _) {
                if let Err(e) = advertising.lock().start() {
                    warn!("Failed to keep advertising: {:?}", e);
                }
            }
        });

        let disconnect_inbox = inbox.clone();
        server.on_disconnect(move |_desc, reason| {
            info!("Client disconnected ({:?})", reason);
            disconnect_inbox.push(LinkEvent::Detached);
        });

        // Counter service
        let counter_service = server.create_service(COUNTER_SERVICE);
        let counter = counter_service.lock().create_characteristic(
            COUNTER_CHAR,
            NimbleProperties::READ
                | NimbleProperties::WRITE
                | NimbleProperties::NOTIFY
                | NimbleProperties::INDICATE,
        );
        let counter_inbox = inbox.clone();
        counter
            .lock()
            .set_value(COUNTER_INITIAL_VALUE.as_bytes())
            .on_read(|value, _desc| {
                info!(
                    "Read request received. Current value: {}",
                    String::from_utf8_lossy(value.value())
                );
            })
            .on_write(move |args| {
                let data = args.recv_data();
                info!("Received value: {}", String::from_utf8_lossy(data));
                counter_inbox.push(LinkEvent::CounterWritten(data.to_vec()));
            });

        // Environmental sensing service
        let env_service = server.create_service(BleUuid::from_uuid16(ENV_SENSING_SERVICE_UUID16));
        let notify = NimbleProperties::READ | NimbleProperties::NOTIFY;
        let temperature = env_service
            .lock()
            .create_characteristic(BleUuid::from_uuid16(TEMPERATURE_CHAR_UUID16), notify);
        let temp_max = env_service
            .lock()
            .create_characteristic(TEMP_MAX_CHAR, notify);
        let temp_min = env_service
            .lock()
            .create_characteristic(TEMP_MIN_CHAR, notify);

        let unit_config = env_service.lock().create_characteristic(
            TEMP_CONFIG_CHAR,
            NimbleProperties::READ | NimbleProperties::WRITE,
        );
        let unit_inbox = inbox.clone();
        unit_config
            .lock()
            .set_value(&[unit.as_config_byte()])
            .on_write(move |args| {
                let data = args.recv_data().to_vec();
                match TemperatureUnit::from_config_bytes(&data) {
                    Ok(_) => unit_inbox.push(LinkEvent::UnitConfigWritten(data)),
                    Err(e) => {
                        warn!("Rejected unit config write: {}", e);
                        args.reject();
                    }
                }
            });

        advertising.lock().set_data(
            BLEAdvertisementData::new()
                .name(DEVICE_NAME)
                .add_service_uuid(COUNTER_SERVICE),
        )?;
        advertising.lock().start()?;

        info!("BLE GATT server started as '{}'", DEVICE_NAME);
        info!("Service UUID: {}", COUNTER_SERVICE_UUID);
        info!("Characteristic UUID: {}", COUNTER_CHAR_UUID);
        info!(
            "Environmental sensing: max {}, min {}, unit config {}",
            TEMP_MAX_CHAR_UUID, TEMP_MIN_CHAR_UUID, TEMP_CONFIG_CHAR_UUID
        );
        info!("Characteristic defined! Now you can read it in your phone!");

        Ok(Self {
            counter,
            temperature,
            temp_max,
            temp_min,
            inbox,
        })
    }
}

impl LinkTransport for GattServer {
    fn take_events(&mut self) -> Vec<LinkEvent> {
        self.inbox.drain()
    }

    fn resume_advertising(&mut self) -> Result<(), LinkError> {
        BLEDevice::take().get_advertising().lock().start()?;
        Ok(())
    }

    fn publish_counter(&mut self, payload: &[u8], notify: bool) {
        let mut counter = self.counter.lock();
        counter.set_value(payload);
        if notify {
            counter.notify();
        }
    }

    fn set_sensor_values(&mut self, payload: &SensorPayload) {
        self.temperature
            .lock()
            .set_value(&payload.current.to_le_bytes());
        self.temp_max.lock().set_value(&payload.max.to_le_bytes());
        self.temp_min.lock().set_value(&payload.min.to_le_bytes());
    }

    fn notify_sensor_values(&mut self) {
        for characteristic in [&self.temperature, &self.temp_max, &self.temp_min] {
            characteristic.lock().notify();
        }
    }
}
