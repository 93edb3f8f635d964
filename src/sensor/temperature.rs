//! Synthetic temperature service.
//!
//! Samples a [`ReadingSource`] every 30 seconds and tracks the running
//! maximum and minimum. All three values are kept in the active unit; a unit
//! change re-encodes them together so the physical reading never changes.

use super::unit::TemperatureUnit;
use crate::clock::{as_millis, elapsed_ms, Millis};
use crate::config::SENSOR_UPDATE_INTERVAL;
use log::info;
use std::time::Duration;

/// Produces temperature samples in degrees Celsius.
pub trait ReadingSource {
    /// Sample the temperature at `now`.
    fn sample_celsius(&mut self, now: Millis) -> f32;
}

/// Time-derived pseudo reading inside `[base - spread, base + spread)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSource {
    base: f32,
    spread: f32,
}

impl SyntheticSource {
    /// Create a source centred on `base` varying by up to `spread`.
    pub fn new(base: f32, spread: f32) -> Self {
        Self {
            base,
            spread: spread.abs(),
        }
    }

    /// Lower (inclusive) and upper (exclusive) bound of generated values.
    pub fn band(&self) -> (f32, f32) {
        (self.base - self.spread, self.base + self.spread)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(-10.5, 5.0)
    }
}

impl ReadingSource for SyntheticSource {
    fn sample_celsius(&mut self, now: Millis) -> f32 {
        let phase = (now % 1000) as f32 / 1000.0;
        self.base + phase * 2.0 * self.spread - self.spread
    }
}

/// Current temperature with running extremes, all in `unit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Latest sample.
    pub current: f32,
    /// Highest sample since init.
    pub max: f32,
    /// Lowest sample since init.
    pub min: f32,
    /// Unit of the three values above.
    pub unit: TemperatureUnit,
    /// When `current` was sampled.
    pub last_sample: Millis,
}

/// Temperature service over a reading source.
pub struct TemperatureService<S = SyntheticSource> {
    source: S,
    reading: SensorReading,
    update_interval: Duration,
}

impl<S: ReadingSource> TemperatureService<S> {
    /// Create the service and take the first sample.
    pub fn new(source: S, now: Millis) -> Self {
        let mut service = Self {
            source,
            reading: SensorReading {
                current: 0.0,
                max: 0.0,
                min: 0.0,
                unit: TemperatureUnit::default(),
                last_sample: now,
            },
            update_interval: SENSOR_UPDATE_INTERVAL,
        };
        service.init(now);
        service
    }

    /// Override the sampling interval.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Seed `current` from the source and reset the extremes to it.
    pub fn init(&mut self, now: Millis) {
        info!("Initializing Temperature Service...");
        let value = self.generate(now);
        self.reading.current = value;
        self.reading.max = value;
        self.reading.min = value;
        self.reading.last_sample = now;
        info!("Temperature Service initialized");
    }

    /// Whether a sampling interval has passed since the last sample.
    pub fn should_update(&self, now: Millis) -> bool {
        elapsed_ms(now, self.reading.last_sample) >= as_millis(self.update_interval)
    }

    /// Take a new sample if due. Returns `true` when a sample was taken.
    pub fn update(&mut self, now: Millis) -> bool {
        if !self.should_update(now) {
            return false;
        }

        let value = self.generate(now);
        let reading = &mut self.reading;
        reading.current = value;
        reading.max = reading.max.max(value);
        reading.min = reading.min.min(value);
        reading.last_sample = now;

        let symbol = reading.unit.symbol();
        info!(
            "Temperature updated: Current={:.2}{}, Max={:.2}{}, Min={:.2}{}",
            reading.current, symbol, reading.max, symbol, reading.min, symbol
        );
        true
    }

    /// Switch the unit, converting current, max and min together.
    pub fn set_unit(&mut self, unit: TemperatureUnit) {
        let from = self.reading.unit;
        if from == unit {
            return;
        }

        let reading = &mut self.reading;
        reading.current = from.convert(reading.current, unit);
        reading.max = from.convert(reading.max, unit);
        reading.min = from.convert(reading.min, unit);
        reading.unit = unit;

        info!("Temperature unit changed to: {}", unit);
    }

    /// Latest sample in the active unit.
    pub fn current(&self) -> f32 {
        self.reading.current
    }

    /// Highest sample in the active unit.
    pub fn max(&self) -> f32 {
        self.reading.max
    }

    /// Lowest sample in the active unit.
    pub fn min(&self) -> f32 {
        self.reading.min
    }

    /// Active unit.
    pub fn unit(&self) -> TemperatureUnit {
        self.reading.unit
    }

    /// Snapshot of the reading.
    pub fn reading(&self) -> SensorReading {
        self.reading
    }

    fn generate(&mut self, now: Millis) -> f32 {
        let celsius = self.source.sample_celsius(now);
        TemperatureUnit::Celsius.convert(celsius, self.reading.unit)
    }
}
