//! Host stand-ins for the device drivers.
//!
//! Used by unit tests and by the host build of the firmware binary. Only
//! available when not building for ESP32.

use crate::ble::{EventInbox, LinkError, LinkEvent, LinkTransport, SensorPayload};
use crate::config::WifiCredentials;
use crate::wifi::{WifiDriver, WifiError};
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, StatefulOutputPin};
use log::debug;
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Address handed out by [`SimWifiDriver`] once joined.
pub const SIM_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 42);

/// Signal strength reported by [`SimWifiDriver`] once joined.
pub const SIM_RSSI: i8 = -58;

const SIM_MAC: [u8; 6] = [0x24, 0x6F, 0x28, 0x3A, 0x5C, 0x91];

/// Error raised by a faulty [`SimOutputPin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinFault;

impl embedded_hal::digital::Error for SimPinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// In-memory output pin.
#[derive(Debug, Default)]
pub struct SimOutputPin {
    high: bool,
    faulty: bool,
    writes: u32,
}

impl SimOutputPin {
    /// A working pin, initially low.
    pub fn new() -> Self {
        Self::default()
    }

    /// A pin whose every write fails.
    pub fn faulty() -> Self {
        Self {
            faulty: true,
            ..Self::default()
        }
    }

    /// Current electrical level.
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    fn write(&mut self, high: bool) -> Result<(), SimPinFault> {
        if self.faulty {
            return Err(SimPinFault);
        }
        self.high = high;
        self.writes += 1;
        Ok(())
    }
}

impl ErrorType for SimOutputPin {
    type Error = SimPinFault;
}

impl OutputPin for SimOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

impl StatefulOutputPin for SimOutputPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

/// Scripted WiFi radio.
///
/// Each join consumes the next scripted result; once the script runs out
/// every join resolves to the fallback.
#[derive(Debug, Default)]
pub struct SimWifiDriver {
    script: VecDeque<bool>,
    fallback: bool,
    rejecting: bool,
    link_up: bool,
    joined_ssid: Option<String>,
    joins: u32,
    last_timeout: Option<Duration>,
}

impl SimWifiDriver {
    /// Every join succeeds.
    pub fn reachable() -> Self {
        Self {
            fallback: true,
            ..Self::default()
        }
    }

    /// Every join times out.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Every join is rejected by the driver before associating.
    pub fn rejecting() -> Self {
        Self {
            rejecting: true,
            ..Self::default()
        }
    }

    /// Joins resolve to `results` in order, then time out.
    pub fn with_join_results<const N: usize>(results: [bool; N]) -> Self {
        Self {
            script: results.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Number of `begin` calls.
    pub fn joins(&self) -> u32 {
        self.joins
    }

    /// Timeout passed to the most recent wait.
    pub fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout
    }

    /// Lose the link without the manager asking.
    pub fn drop_link(&mut self) {
        self.link_up = false;
    }

    /// Associate without the manager asking.
    pub fn bring_up(&mut self) {
        self.link_up = true;
    }
}

impl WifiDriver for SimWifiDriver {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
        self.joins += 1;
        if self.rejecting {
            return Err(WifiError::Driver("radio rejected configuration".into()));
        }
        self.joined_ssid = Some(credentials.ssid.clone());
        Ok(())
    }

    fn wait_connected(&mut self, timeout: Duration) -> Result<bool, WifiError> {
        self.last_timeout = Some(timeout);
        let joined = self.script.pop_front().unwrap_or(self.fallback);
        debug!(
            "sim: join resolved to {} (timeout {} ms)",
            joined,
            timeout.as_millis()
        );
        self.link_up = joined;
        Ok(joined)
    }

    fn is_connected(&self) -> bool {
        self.link_up
    }

    fn disconnect(&mut self) -> Result<(), WifiError> {
        self.link_up = false;
        Ok(())
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        self.link_up.then_some(SIM_IP)
    }

    fn rssi(&self) -> Option<i8> {
        self.link_up.then_some(SIM_RSSI)
    }

    fn ssid(&self) -> Option<String> {
        if self.link_up {
            self.joined_ssid.clone()
        } else {
            None
        }
    }

    fn mac_address(&self) -> Option<[u8; 6]> {
        Some(SIM_MAC)
    }
}

/// In-memory BLE stack.
///
/// Events are injected through the shared [`EventInbox`], as the stack
/// callbacks would.
#[derive(Debug, Default)]
pub struct SimTransport {
    inbox: EventInbox,
    fail_advertising: bool,
    advertising_attempts: u32,
    advertising_restarts: u32,
    counter_value: Vec<u8>,
    counter_notified: Vec<String>,
    sensor_values: Option<SensorPayload>,
    sensor_writes: u32,
    sensor_notifications: u32,
}

impl SimTransport {
    /// A working transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose advertising restarts fail.
    pub fn failing_advertising() -> Self {
        Self {
            fail_advertising: true,
            ..Self::default()
        }
    }

    /// Handle for injecting events.
    pub fn inbox(&self) -> EventInbox {
        self.inbox.clone()
    }

    /// Advertising restart calls, failed or not.
    pub fn advertising_attempts(&self) -> u32 {
        self.advertising_attempts
    }

    /// Successful advertising restarts.
    pub fn advertising_restarts(&self) -> u32 {
        self.advertising_restarts
    }

    /// Counter payloads sent as notifications, oldest first.
    pub fn counter_payloads(&self) -> Vec<String> {
        self.counter_notified.clone()
    }

    /// Current counter characteristic value.
    pub fn counter_value(&self) -> &[u8] {
        &self.counter_value
    }

    /// Last values stored in the temperature characteristics.
    pub fn sensor_values(&self) -> Option<SensorPayload> {
        self.sensor_values
    }

    /// Number of temperature characteristic writes.
    pub fn sensor_writes(&self) -> u32 {
        self.sensor_writes
    }

    /// Number of temperature notifications.
    pub fn sensor_notifications(&self) -> u32 {
        self.sensor_notifications
    }
}

impl LinkTransport for SimTransport {
    fn take_events(&mut self) -> Vec<LinkEvent> {
        self.inbox.drain()
    }

    fn resume_advertising(&mut self) -> Result<(), LinkError> {
        self.advertising_attempts += 1;
        if self.fail_advertising {
            return Err(LinkError::Transport("advertising start rejected".into()));
        }
        self.advertising_restarts += 1;
        Ok(())
    }

    fn publish_counter(&mut self, payload: &[u8], notify: bool) {
        self.counter_value = payload.to_vec();
        if notify {
            self.counter_notified
                .push(String::from_utf8_lossy(payload).into_owned());
        }
    }

    fn set_sensor_values(&mut self, payload: &SensorPayload) {
        self.sensor_values = Some(*payload);
        self.sensor_writes += 1;
    }

    fn notify_sensor_values(&mut self) {
        self.sensor_notifications += 1;
    }
}
