//! WiFi driver capability interface.
//!
//! [`WifiManager`](super::WifiManager) only needs a handful of calls from the
//! radio driver; this trait names them so the join logic runs the same over
//! the ESP-IDF driver and the host simulation.

use crate::config::WifiCredentials;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Calls the join manager makes into the WiFi driver.
pub trait WifiDriver {
    /// Configure station mode with `credentials` and start associating.
    ///
    /// Does not wait for the link to come up.
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError>;

    /// Block until the station has an IP address or `timeout` passes.
    ///
    /// Returns `Ok(false)` on timeout.
    fn wait_connected(&mut self, timeout: Duration) -> Result<bool, WifiError>;

    /// Whether the driver currently reports an associated link.
    fn is_connected(&self) -> bool;

    /// Drop the current association.
    fn disconnect(&mut self) -> Result<(), WifiError>;

    /// Station IPv4 address, if assigned.
    fn ip_address(&self) -> Option<Ipv4Addr>;

    /// Signal strength of the current access point in dBm.
    fn rssi(&self) -> Option<i8>;

    /// SSID of the current access point.
    fn ssid(&self) -> Option<String>;

    /// Station MAC address.
    fn mac_address(&self) -> Option<[u8; 6]>;
}

/// Errors that can occur during WiFi operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiError {
    /// The join did not complete within the timeout.
    JoinTimeout {
        /// Timeout that expired.
        timeout: Duration,
    },
    /// SSID could not be handed to the driver.
    InvalidSsid,
    /// Password could not be handed to the driver.
    InvalidPassword,
    /// The driver rejected a call.
    Driver(String),
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinTimeout { timeout } => {
                write!(f, "join timed out after {} ms", timeout.as_millis())
            }
            Self::InvalidSsid => write!(f, "invalid SSID"),
            Self::InvalidPassword => write!(f, "invalid password"),
            Self::Driver(msg) => write!(f, "driver error: {}", msg),
        }
    }
}

impl std::error::Error for WifiError {}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for WifiError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Driver(format!("{:?}", e))
    }
}

/// Part of a join `budget` left after `spent`, `None` once it is used up.
///
/// Lets a driver split one join timeout across association and DHCP.
pub fn remaining_budget(budget: Duration, spent: Duration) -> Option<Duration> {
    budget.checked_sub(spent).filter(|left| !left.is_zero())
}

/// Format a MAC address as `XX:XX:XX:XX:XX:XX`.
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mac() {
        let mac = [0x24, 0x6f, 0x28, 0x0a, 0xb1, 0x00];
        let formatted = format_mac(&mac);
        assert_eq!(formatted, "24:6F:28:0A:B1:00");
        assert_eq!(formatted.len(), 17);
    }

    #[test]
    fn test_remaining_budget() {
        let budget = Duration::from_millis(20_000);
        assert_eq!(
            remaining_budget(budget, Duration::from_millis(19_900)),
            Some(Duration::from_millis(100))
        );
        assert_eq!(remaining_budget(budget, Duration::ZERO), Some(budget));
        assert_eq!(remaining_budget(budget, budget), None);
        assert_eq!(remaining_budget(budget, Duration::from_secs(35)), None);
    }

    #[test]
    fn test_timeout_display() {
        let err = WifiError::JoinTimeout {
            timeout: Duration::from_millis(20_000),
        };
        assert_eq!(err.to_string(), "join timed out after 20000 ms");
    }
}
