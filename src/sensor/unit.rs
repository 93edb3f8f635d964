//! Temperature units and conversion.
//!
//! # Example
//!
//! ```
//! use esp32_sensor_node::sensor::{celsius_to_fahrenheit, TemperatureUnit};
//!
//! assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
//! assert_eq!(TemperatureUnit::from_config_bytes(&[1]), Ok(TemperatureUnit::Fahrenheit));
//! assert!(TemperatureUnit::from_config_bytes(&[2]).is_err());
//! ```

use crate::config::ConfigError;
use std::fmt;

/// Unit used to encode temperature values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    /// Degrees Celsius (config byte `0`).
    #[default]
    Celsius,
    /// Degrees Fahrenheit (config byte `1`).
    Fahrenheit,
}

impl TemperatureUnit {
    /// Byte stored in the unit config characteristic.
    pub fn as_config_byte(self) -> u8 {
        match self {
            Self::Celsius => 0,
            Self::Fahrenheit => 1,
        }
    }

    /// Parse a unit config characteristic write.
    ///
    /// Accepts exactly one byte, `0` or `1`.
    pub fn from_config_bytes(data: &[u8]) -> Result<Self, ConfigError> {
        match data {
            [byte] => Self::try_from(*byte),
            _ => Err(ConfigError::invalid(
                "temperature_unit",
                format!("expected 1 byte, got {}", data.len()),
            )),
        }
    }

    /// Unit suffix for log output.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Re-encode `value` from `self` into `target`.
    pub fn convert(self, value: f32, target: Self) -> f32 {
        match (self, target) {
            (Self::Celsius, Self::Fahrenheit) => celsius_to_fahrenheit(value),
            (Self::Fahrenheit, Self::Celsius) => fahrenheit_to_celsius(value),
            _ => value,
        }
    }
}

impl TryFrom<u8> for TemperatureUnit {
    type Error = ConfigError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Celsius),
            1 => Ok(Self::Fahrenheit),
            other => Err(ConfigError::invalid(
                "temperature_unit",
                format!("{} is not 0 (Celsius) or 1 (Fahrenheit)", other),
            )),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius => write!(f, "Celsius"),
            Self::Fahrenheit => write!(f, "Fahrenheit"),
        }
    }
}

/// °C → °F.
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// °F → °C.
pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_points() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
        assert_eq!(fahrenheit_to_celsius(212.0), 100.0);
    }

    #[test]
    fn test_config_byte_round_trip() {
        for unit in [TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit] {
            assert_eq!(TemperatureUnit::try_from(unit.as_config_byte()), Ok(unit));
        }
    }

    #[test]
    fn test_rejects_out_of_range_byte() {
        for byte in [2u8, 0x30, 0xFF] {
            assert!(matches!(
                TemperatureUnit::try_from(byte),
                Err(ConfigError::InvalidConfigValue { name: "temperature_unit", .. })
            ));
        }
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(TemperatureUnit::from_config_bytes(&[]).is_err());
        assert!(TemperatureUnit::from_config_bytes(&[0, 1]).is_err());
        assert_eq!(
            TemperatureUnit::from_config_bytes(&[0]),
            Ok(TemperatureUnit::Celsius)
        );
    }

    #[test]
    fn test_convert_same_unit_is_identity() {
        let unit = TemperatureUnit::Fahrenheit;
        assert_eq!(unit.convert(71.5, TemperatureUnit::Fahrenheit), 71.5);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(TemperatureUnit::Celsius.symbol(), "°C");
        assert_eq!(TemperatureUnit::Fahrenheit.symbol(), "°F");
        assert_eq!(TemperatureUnit::default(), TemperatureUnit::Celsius);
    }
}
