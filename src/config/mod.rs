//! Firmware configuration.
//!
//! All settings are compile-time constants; there is no persisted
//! configuration and every value is reinitialized at boot.
//!
//! # Components
//!
//! - [`wifi`] - WiFi credentials and join timing
//! - [`error`] - validation errors shared by all config consumers

mod error;
mod wifi;

use std::time::Duration;

pub use error::ConfigError;
pub use wifi::{
    WifiCredentials, DEFAULT_PASSWORD, DEFAULT_SSID, JOIN_COOLDOWN, JOIN_TIMEOUT,
    MAX_JOIN_ATTEMPTS, MAX_PASSWORD_LEN, MAX_SSID_LEN, MIN_PASSWORD_LEN, WIFI_PASSWORD,
    WIFI_SSID,
};

/// GPIO driving the status LED (ESP32-S3 DevKit built-in LED).
pub const BLINK_GPIO: u8 = 48;

/// Time between LED toggles.
pub const BLINK_PERIOD: Duration = Duration::from_millis(1000);

/// Sleep at the end of every loop iteration.
pub const LOOP_INTERVAL: Duration = Duration::from_millis(100);

/// Time between synthetic temperature samples.
pub const SENSOR_UPDATE_INTERVAL: Duration = Duration::from_millis(30_000);

/// Minimum time between sensor notifications to an attached client.
pub const SENSOR_NOTIFY_INTERVAL: Duration = Duration::from_millis(30_000);

/// Time between counter notifications while a client stays attached.
pub const COUNTER_NOTIFY_INTERVAL: Duration = Duration::from_millis(3000);

/// Settle time for the BLE stack between a disconnect and re-advertising.
pub const READVERTISE_DELAY: Duration = Duration::from_millis(500);

/// BLE device name used for advertising.
pub const DEVICE_NAME: &str = "ESP32-S3-BLE-Device";

/// Static passkey shown during pairing.
pub const BLE_PASSKEY: u32 = 123_456;

/// Counter service UUID.
pub const COUNTER_SERVICE_UUID: &str = "12345678-1234-1234-1234-123456789abc";

/// Counter characteristic UUID.
pub const COUNTER_CHAR_UUID: &str = "87654321-4321-4321-4321-cba987654321";

/// Value of the counter characteristic before the first notification.
pub const COUNTER_INITIAL_VALUE: &str = "Hello ESP32-S3";

/// Environmental Sensing service (Bluetooth SIG assigned number).
pub const ENV_SENSING_SERVICE_UUID16: u16 = 0x181A;

/// Temperature characteristic (Bluetooth SIG assigned number).
pub const TEMPERATURE_CHAR_UUID16: u16 = 0x2A6E;

/// Maximum temperature characteristic UUID.
pub const TEMP_MAX_CHAR_UUID: &str = "6e400002-b5a3-f393-e0a9-e50e24dcca9e";

/// Minimum temperature characteristic UUID.
pub const TEMP_MIN_CHAR_UUID: &str = "6e400003-b5a3-f393-e0a9-e50e24dcca9e";

/// Temperature unit config characteristic UUID.
pub const TEMP_CONFIG_CHAR_UUID: &str = "6e400004-b5a3-f393-e0a9-e50e24dcca9e";

#[cfg(test)]
mod tests {
    use super::*;

    fn is_uuid128(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() == 36
            && [8, 13, 18, 23].iter().all(|&i| bytes[i] == b'-')
            && s.chars().filter(|c| *c != '-').all(|c| c.is_ascii_hexdigit())
    }

    #[test]
    fn test_uuid_format() {
        for uuid in [
            COUNTER_SERVICE_UUID,
            COUNTER_CHAR_UUID,
            TEMP_MAX_CHAR_UUID,
            TEMP_MIN_CHAR_UUID,
            TEMP_CONFIG_CHAR_UUID,
        ] {
            assert!(is_uuid128(uuid), "malformed UUID: {}", uuid);
        }
    }

    #[test]
    fn test_device_name() {
        assert_eq!(DEVICE_NAME, "ESP32-S3-BLE-Device");
    }

    #[test]
    fn test_notify_cadence_not_faster_than_loop() {
        assert!(COUNTER_NOTIFY_INTERVAL > LOOP_INTERVAL);
        assert!(SENSOR_NOTIFY_INTERVAL > LOOP_INTERVAL);
    }
}
