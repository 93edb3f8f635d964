//! WiFi station support.
//!
//! # Components
//!
//! - [`driver`] - capability trait the join logic drives, plus [`WifiError`]
//! - [`manager`] - join manager with bounded retries (host-testable)
//! - [`connection`] - ESP-IDF driver implementation (ESP32 only)
//!
//! Credentials and join timing live in [`crate::config`].

mod driver;
mod manager;

#[cfg(feature = "esp32")]
mod connection;

pub use driver::{format_mac, remaining_budget, WifiDriver, WifiError};
pub use manager::{JoinOutcome, NetworkSession, WifiManager, NOT_CONNECTED};

#[cfg(feature = "esp32")]
pub use connection::EspWifiDriver;
