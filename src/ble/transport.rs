//! BLE transport capability interface.
//!
//! The BLE stack reports connection changes and characteristic writes as
//! [`LinkEvent`]s pushed into an [`EventInbox`]. Stack callbacks run on the
//! NimBLE host task, so they only enqueue; the application loop drains the
//! inbox through [`LinkTransport::take_events`].

use crate::sensor::SensorReading;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A central connected.
    Attached,
    /// The central disconnected.
    Detached,
    /// Data written to the counter characteristic.
    CounterWritten(Vec<u8>),
    /// Data written to the temperature unit config characteristic.
    UnitConfigWritten(Vec<u8>),
}

/// Calls the link manager makes into the BLE stack.
pub trait LinkTransport {
    /// Drain events observed since the last call, oldest first.
    fn take_events(&mut self) -> Vec<LinkEvent>;

    /// Start advertising again after a disconnect.
    fn resume_advertising(&mut self) -> Result<(), LinkError>;

    /// Set the counter characteristic, optionally notifying subscribers.
    fn publish_counter(&mut self, payload: &[u8], notify: bool);

    /// Set the three temperature characteristics.
    fn set_sensor_values(&mut self, payload: &SensorPayload);

    /// Notify subscribers of the temperature characteristics.
    fn notify_sensor_values(&mut self);
}

/// Shared queue between stack callbacks and the loop.
#[derive(Debug, Clone, Default)]
pub struct EventInbox(Arc<Mutex<VecDeque<LinkEvent>>>);

impl EventInbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an event.
    pub fn push(&self, event: LinkEvent) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    /// Take all queued events.
    pub fn drain(&self) -> Vec<LinkEvent> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no events are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Temperature values as transmitted: value × 100, signed 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorPayload {
    /// Current temperature.
    pub current: i16,
    /// Maximum temperature.
    pub max: i16,
    /// Minimum temperature.
    pub min: i16,
}

impl SensorPayload {
    /// Encode a reading in its own unit.
    pub fn from_reading(reading: &SensorReading) -> Self {
        Self {
            current: encode_fixed(reading.current),
            max: encode_fixed(reading.max),
            min: encode_fixed(reading.min),
        }
    }
}

/// Encode as hundredths, rounded, saturating at the `i16` range.
pub fn encode_fixed(value: f32) -> i16 {
    // `as` saturates out-of-range floats and maps NaN to 0
    (value * 100.0).round() as i16
}

/// Decode hundredths back into a float.
pub fn decode_fixed(raw: i16) -> f32 {
    f32::from(raw) / 100.0
}

/// Errors from the BLE stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The stack rejected a call.
    Transport(String),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "BLE transport error: {}", msg),
        }
    }
}

impl std::error::Error for LinkError {}

#[cfg(feature = "esp32")]
impl From<esp32_nimble::BLEError> for LinkError {
    fn from(e: esp32_nimble::BLEError) -> Self {
        Self::Transport(format!("{:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::TemperatureUnit;

    #[test]
    fn test_encode_fixed_rounds_to_hundredths() {
        assert_eq!(encode_fixed(21.5), 2150);
        assert_eq!(encode_fixed(-10.256), -1026);
        assert_eq!(encode_fixed(0.004), 0);
    }

    #[test]
    fn test_encode_fixed_saturates() {
        assert_eq!(encode_fixed(400.0), i16::MAX);
        assert_eq!(encode_fixed(-400.0), i16::MIN);
        assert_eq!(encode_fixed(f32::NAN), 0);
    }

    #[test]
    fn test_decode_fixed() {
        assert!((decode_fixed(-1050) - -10.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_payload_from_reading() {
        let reading = SensorReading {
            current: -10.5,
            max: -5.51,
            min: -15.5,
            unit: TemperatureUnit::Celsius,
            last_sample: 0,
        };
        assert_eq!(
            SensorPayload::from_reading(&reading),
            SensorPayload {
                current: -1050,
                max: -551,
                min: -1550
            }
        );
    }

    #[test]
    fn test_inbox_preserves_order() {
        let inbox = EventInbox::new();
        let producer = inbox.clone();
        producer.push(LinkEvent::Attached);
        producer.push(LinkEvent::UnitConfigWritten(vec![1]));
        producer.push(LinkEvent::Detached);

        assert_eq!(inbox.len(), 3);
        assert_eq!(
            inbox.drain(),
            vec![
                LinkEvent::Attached,
                LinkEvent::UnitConfigWritten(vec![1]),
                LinkEvent::Detached
            ]
        );
        assert!(inbox.is_empty());
    }
}
