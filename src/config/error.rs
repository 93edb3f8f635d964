//! Configuration errors.

use std::fmt;

/// Errors that can occur while validating configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting or runtime config write is outside its accepted range.
    InvalidConfigValue {
        /// Name of the setting.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Password is too short for WPA2.
    PasswordTooShort { len: usize, min: usize },
    /// Password exceeds maximum length.
    PasswordTooLong { len: usize, max: usize },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidConfigValue`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfigValue { name, reason } => {
                write!(f, "invalid value for {}: {}", name, reason)
            }
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooShort { len, min } => {
                write!(f, "password too short: {} bytes (min {})", len, min)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
