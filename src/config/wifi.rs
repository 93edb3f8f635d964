//! WiFi credentials and join timing.
//!
//! Credentials are baked in at build time from the `WIFI_SSID` and
//! `WIFI_PASSWORD` environment variables. Nothing is persisted on the device.
//!
//! # Example
//!
//! ```
//! use esp32_sensor_node::config::WifiCredentials;
//!
//! let creds = WifiCredentials::new("MyNetwork", "MyPassword").unwrap();
//! assert!(!creds.is_open());
//! assert!(WifiCredentials::new("", "MyPassword").is_err());
//! ```

use super::ConfigError;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum password length for WPA2.
pub const MIN_PASSWORD_LEN: usize = 8;

/// SSID used when none is supplied at build time.
pub const DEFAULT_SSID: &str = "YourSSID";

/// Password used when none is supplied at build time.
pub const DEFAULT_PASSWORD: &str = "YourPassword";

/// Network name baked into the firmware.
pub const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => DEFAULT_SSID,
};

/// Network password baked into the firmware.
pub const WIFI_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(password) => password,
    None => DEFAULT_PASSWORD,
};

/// How long a single join may block the loop.
pub const JOIN_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Failed joins allowed before the cooldown kicks in.
pub const MAX_JOIN_ATTEMPTS: u32 = 3;

/// Wait after exhausting join attempts.
pub const JOIN_COOLDOWN: Duration = Duration::from_millis(30_000);

/// WiFi credentials for connecting to an access point.
///
/// The password is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WifiCredentials {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network password (8-64 bytes for WPA2, empty for open networks).
    pub password: String,
}

impl WifiCredentials {
    /// Create validated credentials.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let creds = Self {
            ssid: ssid.into(),
            password: password.into(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Credentials for an open network (no password).
    pub fn open(ssid: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(ssid, String::new())
    }

    /// Credentials compiled into the firmware.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::new(WIFI_SSID, WIFI_PASSWORD)
    }

    /// Validate SSID and password lengths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() {
            return Err(ConfigError::SsidEmpty);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::SsidTooLong {
                len: self.ssid.len(),
                max: MAX_SSID_LEN,
            });
        }

        // Empty password means open network
        if !self.password.is_empty() && self.password.len() < MIN_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooShort {
                len: self.password.len(),
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(ConfigError::PasswordTooLong {
                len: self.password.len(),
                max: MAX_PASSWORD_LEN,
            });
        }

        Ok(())
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl std::fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let creds = WifiCredentials::new("TestNetwork", "password123").unwrap();
        assert_eq!(creds.ssid, "TestNetwork");
        assert!(!creds.is_open());
    }

    #[test]
    fn test_open_network() {
        let creds = WifiCredentials::open("OpenNetwork").unwrap();
        assert!(creds.is_open());
    }

    #[test]
    fn test_empty_ssid() {
        assert_eq!(
            WifiCredentials::new("", "password123"),
            Err(ConfigError::SsidEmpty)
        );
    }

    #[test]
    fn test_ssid_length_bounds() {
        assert!(WifiCredentials::new("a".repeat(32), "password123").is_ok());
        assert!(matches!(
            WifiCredentials::new("a".repeat(33), "password123"),
            Err(ConfigError::SsidTooLong { len: 33, max: 32 })
        ));
    }

    #[test]
    fn test_password_length_bounds() {
        assert!(matches!(
            WifiCredentials::new("Net", "short"),
            Err(ConfigError::PasswordTooShort { .. })
        ));
        assert!(WifiCredentials::new("Net", "12345678").is_ok());
        assert!(WifiCredentials::new("Net", "a".repeat(64)).is_ok());
        assert!(matches!(
            WifiCredentials::new("Net", "a".repeat(65)),
            Err(ConfigError::PasswordTooLong { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = WifiCredentials::new("Net", "supersecret").unwrap();
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("Net"));
        assert!(!rendered.contains("supersecret"));
    }

    #[test]
    fn test_build_defaults_are_valid() {
        // Placeholders must pass validation so the firmware always boots
        assert!(WifiCredentials::new(DEFAULT_SSID, DEFAULT_PASSWORD).is_ok());
    }

    #[test]
    fn test_join_timing_constants() {
        assert_eq!(JOIN_TIMEOUT, Duration::from_millis(20_000));
        assert_eq!(MAX_JOIN_ATTEMPTS, 3);
        assert_eq!(JOIN_COOLDOWN, Duration::from_millis(30_000));
    }
}
