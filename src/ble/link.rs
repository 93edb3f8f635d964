//! Peripheral link manager.
//!
//! Tracks whether a central is attached and reacts to edges of that flag:
//!
//! ```text
//!            attach                      detach
//!  Detached ────────► Attached ────────────────► Detached
//!      ▲              (counter every 3 s)         │
//!      │                                          │ 500 ms
//!      └─────────────── resume advertising ◄──────┘
//! ```
//!
//! A failed advertising restart is retried after the same delay, bounded by a
//! [`ReconnectPolicy`]. All timing is a scheduled check against `now`;
//! nothing here blocks.

use super::transport::{LinkEvent, LinkTransport, SensorPayload};
use crate::clock::{as_millis, elapsed_ms, Millis};
use crate::config::{ConfigError, COUNTER_NOTIFY_INTERVAL, READVERTISE_DELAY};
use crate::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::sensor::SensorReading;
use log::{debug, info, warn};
use std::time::Duration;

/// Connection bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkState {
    /// Whether a central is attached now.
    pub attached: bool,
    /// Value of `attached` at the last poll.
    pub previous_attached: bool,
    /// Last counter value sent.
    pub counter: u32,
}

/// Edge observed by [`PeripheralLink::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTransition {
    /// A central attached since the last poll.
    Attached,
    /// The central detached since the last poll.
    Detached,
}

/// Counter characteristic payload for `value`.
pub fn counter_payload(value: u32) -> String {
    format!("Count: {}", value)
}

/// BLE peripheral link over a [`LinkTransport`].
pub struct PeripheralLink<T> {
    transport: T,
    state: LinkState,
    counter_interval: Duration,
    readvertise_delay: Duration,
    last_counter_push: Option<Millis>,
    readvertise_at: Option<Millis>,
    advertising: ReconnectPolicy,
    sensor_values: Option<SensorPayload>,
    sessions: u32,
}

impl<T: LinkTransport> PeripheralLink<T> {
    /// Wrap a started transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: LinkState::default(),
            counter_interval: COUNTER_NOTIFY_INTERVAL,
            readvertise_delay: READVERTISE_DELAY,
            last_counter_push: None,
            readvertise_at: None,
            advertising: ReconnectPolicy::default(),
            sensor_values: None,
            sessions: 0,
        }
    }

    /// Override the retry limits for advertising restarts.
    pub fn with_advertising_retry(mut self, config: ReconnectConfig) -> Result<Self, ConfigError> {
        self.advertising = ReconnectPolicy::new(config)?;
        Ok(self)
    }

    /// Override the counter notification interval.
    pub fn with_counter_interval(mut self, interval: Duration) -> Self {
        self.counter_interval = interval;
        self
    }

    /// Override the delay before advertising resumes after a detach.
    pub fn with_readvertise_delay(mut self, delay: Duration) -> Self {
        self.readvertise_delay = delay;
        self
    }

    /// Store `reading` in the sensor characteristics before any central
    /// attaches, so an early read sees a value.
    pub fn with_sensor_values(mut self, reading: &SensorReading) -> Self {
        let payload = SensorPayload::from_reading(reading);
        self.transport.set_sensor_values(&payload);
        self.sensor_values = Some(payload);
        self
    }

    /// Drain transport events. Attach and detach events update the
    /// connection flag; all events are returned for the caller to dispatch.
    pub fn take_events(&mut self) -> Vec<LinkEvent> {
        let events = self.transport.take_events();
        for event in &events {
            match event {
                LinkEvent::Attached => self.set_attached(true),
                LinkEvent::Detached => self.set_attached(false),
                _ => {}
            }
        }
        events
    }

    /// Set the connection flag. Edges are acted on by the next [`poll`](Self::poll).
    pub fn set_attached(&mut self, attached: bool) {
        self.state.attached = attached;
    }

    /// Whether a central is attached.
    pub fn is_attached(&self) -> bool {
        self.state.attached
    }

    /// Handle connection edges, pending re-advertising and the counter.
    pub fn poll(&mut self, now: Millis) -> Option<LinkTransition> {
        let transition = match (self.state.attached, self.state.previous_attached) {
            (false, true) => {
                self.state.previous_attached = false;
                self.readvertise_at = Some(now.saturating_add(as_millis(self.readvertise_delay)));
                info!("Client detached, advertising resumes shortly");
                Some(LinkTransition::Detached)
            }
            (true, false) => {
                self.state.previous_attached = true;
                self.readvertise_at = None;
                self.last_counter_push = None;
                self.sessions += 1;
                info!("Client attached (session {})", self.sessions);
                Some(LinkTransition::Attached)
            }
            _ => None,
        };

        if let Some(at) = self.readvertise_at {
            if now >= at {
                self.readvertise_at = self.resume_advertising(now);
            }
        }

        if self.state.attached && self.counter_due(now) {
            self.state.counter = self.state.counter.wrapping_add(1);
            let payload = counter_payload(self.state.counter);
            self.transport.publish_counter(payload.as_bytes(), true);
            self.last_counter_push = Some(now);
            info!("Sent notification: {}", payload);
        }

        transition
    }

    /// Store the reading in the temperature characteristics.
    ///
    /// Skipped while detached and when the encoded values are unchanged.
    pub fn push_sensor_values(&mut self, reading: &SensorReading) {
        if !self.state.attached {
            return;
        }
        let payload = SensorPayload::from_reading(reading);
        if self.sensor_values == Some(payload) {
            return;
        }
        self.transport.set_sensor_values(&payload);
        self.sensor_values = Some(payload);
    }

    /// Notify the temperature characteristics. Returns `false` while detached.
    pub fn notify_sensor_values(&mut self) -> bool {
        if !self.state.attached {
            return false;
        }
        self.transport.notify_sensor_values();
        debug!("Sensor values notified");
        true
    }

    /// Connection bookkeeping.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of attach edges seen.
    pub fn sessions(&self) -> u32 {
        self.sessions
    }

    /// Whether advertising is scheduled to resume.
    pub fn readvertise_pending(&self) -> bool {
        self.readvertise_at.is_some()
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Try to restart advertising. Returns when to try again, if needed.
    fn resume_advertising(&mut self, now: Millis) -> Option<Millis> {
        if !self.advertising.should_attempt(now) {
            let wait = self
                .advertising
                .cooldown_remaining(now)
                .unwrap_or(self.readvertise_delay);
            return Some(now.saturating_add(as_millis(wait)));
        }

        match self.transport.resume_advertising() {
            Ok(()) => {
                self.advertising.record_attempt(now, true);
                info!("Start advertising");
                None
            }
            Err(e) => {
                self.advertising.record_attempt(now, false);
                warn!(
                    "Failed to restart advertising (attempt {} of {}): {}",
                    self.advertising.attempts(),
                    self.advertising.config().max_attempts,
                    e
                );
                Some(now.saturating_add(as_millis(self.readvertise_delay)))
            }
        }
    }

    /// Advertising restart bookkeeping.
    pub fn advertising_policy(&self) -> &ReconnectPolicy {
        &self.advertising
    }

    fn counter_due(&self, now: Millis) -> bool {
        match self.last_counter_push {
            None => true,
            Some(last) => elapsed_ms(now, last) >= as_millis(self.counter_interval),
        }
    }
}
