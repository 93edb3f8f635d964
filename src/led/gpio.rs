//! ESP-IDF GPIO output driver.

use super::{LedError, PinId};
use esp_idf_hal::gpio::{AnyOutputPin, Output, Pin, PinDriver};

/// Output driver type used on the device.
pub type EspOutputPin = PinDriver<'static, AnyOutputPin, Output>;

/// Reset a pin to its default state and configure it as a push-pull output.
pub fn open_output(pin: AnyOutputPin) -> Result<(PinId, EspOutputPin), LedError> {
    let id = pin.pin() as PinId;
    // PinDriver::output resets the pin before switching it to output mode
    let driver = PinDriver::output(pin).map_err(|e| LedError::HardwareFault {
        pin: id,
        reason: format!("{:?}", e),
    })?;
    Ok((id, driver))
}
