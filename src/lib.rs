//! ESP32 sensor node firmware library.
//!
//! Everything except the ESP-IDF driver adapters is platform independent and
//! tested on the host machine without ESP32 hardware.

pub mod app;
pub mod ble;
pub mod clock;
pub mod config;
pub mod led;
pub mod reconnect;
pub mod sensor;
#[cfg(not(feature = "esp32"))]
pub mod sim;
pub mod wifi;

// Re-export commonly used items
pub use app::App;
pub use ble::{LinkEvent, LinkTransport, PeripheralLink};
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use config::{ConfigError, WifiCredentials};
pub use led::{LedController, LedError};
pub use reconnect::{ReconnectConfig, ReconnectPhase, ReconnectPolicy};
pub use sensor::{TemperatureService, TemperatureUnit};
pub use wifi::{WifiDriver, WifiError, WifiManager};
