//! Synthetic temperature sensor.
//!
//! - [`unit`] - Celsius/Fahrenheit handling and the unit config byte
//! - [`temperature`] - sampling service with running max/min

mod temperature;
mod unit;

pub use temperature::{ReadingSource, SensorReading, SyntheticSource, TemperatureService};
pub use unit::{celsius_to_fahrenheit, fahrenheit_to_celsius, TemperatureUnit};
