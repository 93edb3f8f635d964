//! Single-pin digital output controller.

use embedded_hal::digital::{Error as _, PinState, StatefulOutputPin};
use log::{error, info};
use std::fmt;

/// GPIO number.
pub type PinId = u8;

/// Logical state of the controlled pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputState {
    /// GPIO number.
    pub pin: PinId,
    /// Last level written (`true` = high).
    pub level: bool,
}

/// Errors from the output driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedError {
    /// The driver rejected a configuration or write.
    HardwareFault {
        /// GPIO number.
        pin: PinId,
        /// Driver-provided reason.
        reason: String,
    },
}

impl fmt::Display for LedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareFault { pin, reason } => {
                write!(f, "hardware fault on GPIO {}: {}", pin, reason)
            }
        }
    }
}

impl std::error::Error for LedError {}

/// Owns one output pin and its logical level.
pub struct LedController<P> {
    driver: P,
    state: OutputState,
}

impl<P: StatefulOutputPin> LedController<P> {
    /// Take ownership of a configured output driver and force it low.
    pub fn init(pin: PinId, mut driver: P) -> Result<Self, LedError> {
        info!("Initializing LED control on GPIO {}", pin);

        driver.set_low().map_err(|e| {
            let err = fault(pin, e);
            error!("Failed to set initial LED state: {}", err);
            err
        })?;

        info!("LED control initialized on GPIO {}", pin);
        Ok(Self {
            driver,
            state: OutputState { pin, level: false },
        })
    }

    /// Write a level.
    pub fn set(&mut self, level: bool) -> Result<(), LedError> {
        let pin = self.state.pin;
        self.driver
            .set_state(PinState::from(level))
            .map_err(|e| fault(pin, e))?;
        self.state.level = level;
        Ok(())
    }

    /// Drive the pin high.
    pub fn on(&mut self) -> Result<(), LedError> {
        self.set(true)
    }

    /// Drive the pin low.
    pub fn off(&mut self) -> Result<(), LedError> {
        self.set(false)
    }

    /// Invert the level currently reported by the driver.
    ///
    /// Reads back from the driver rather than the cached state, so a level
    /// changed behind our back is still inverted correctly.
    pub fn toggle(&mut self) -> Result<bool, LedError> {
        let pin = self.state.pin;
        let current = self.driver.is_set_high().map_err(|e| fault(pin, e))?;
        self.set(!current)?;
        Ok(!current)
    }

    /// Last level written by this controller.
    pub fn level(&self) -> bool {
        self.state.level
    }

    /// GPIO number.
    pub fn pin(&self) -> PinId {
        self.state.pin
    }

    /// Snapshot of the output state.
    pub fn state(&self) -> OutputState {
        self.state
    }

    /// Access the underlying driver.
    pub fn driver_mut(&mut self) -> &mut P {
        &mut self.driver
    }
}

fn fault<E: embedded_hal::digital::Error>(pin: PinId, e: E) -> LedError {
    LedError::HardwareFault {
        pin,
        reason: format!("{:?}", e.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimOutputPin;
    use embedded_hal::digital::OutputPin;

    #[test]
    fn test_init_forces_low() {
        let mut pin = SimOutputPin::new();
        pin.set_high().unwrap();

        let led = LedController::init(48, pin).unwrap();
        assert!(!led.level());
        assert_eq!(led.state(), OutputState { pin: 48, level: false });
    }

    #[test]
    fn test_init_reports_hardware_fault() {
        let result = LedController::init(7, SimOutputPin::faulty());
        assert!(matches!(
            result,
            Err(LedError::HardwareFault { pin: 7, .. })
        ));
    }

    #[test]
    fn test_on_off_for_all_pins() {
        for pin in [0u8, 2, 13, 48] {
            let mut led = LedController::init(pin, SimOutputPin::new()).unwrap();
            led.on().unwrap();
            assert!(led.level());
            assert!(led.driver_mut().is_high());
            led.off().unwrap();
            assert!(!led.level());
            assert!(!led.driver_mut().is_high());
        }
    }

    #[test]
    fn test_toggle_inverts_previous_level() {
        let mut led = LedController::init(48, SimOutputPin::new()).unwrap();
        assert!(led.toggle().unwrap());
        assert!(led.level());
        assert!(!led.toggle().unwrap());
        assert!(!led.level());
    }

    #[test]
    fn test_toggle_reads_back_from_driver() {
        let mut led = LedController::init(48, SimOutputPin::new()).unwrap();

        // Level changed outside the controller
        led.driver_mut().set_high().unwrap();
        assert!(!led.level());

        assert!(!led.toggle().unwrap());
        assert!(!led.driver_mut().is_high());
    }

    #[test]
    fn test_set_explicit_level() {
        let mut led = LedController::init(48, SimOutputPin::new()).unwrap();
        led.set(true).unwrap();
        assert!(led.driver_mut().is_high());
        led.set(false).unwrap();
        assert!(!led.driver_mut().is_high());
    }
}
