//! Status LED output.
//!
//! - [`controller`] - pin state bookkeeping over any `embedded-hal` output pin
//! - [`gpio`] - ESP-IDF `PinDriver` construction (ESP32 only)

mod controller;
#[cfg(feature = "esp32")]
mod gpio;

pub use controller::{LedController, LedError, OutputState, PinId};

#[cfg(feature = "esp32")]
pub use gpio::{open_output, EspOutputPin};
