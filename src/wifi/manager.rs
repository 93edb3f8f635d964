//! Network join manager.
//!
//! Joins the configured access point under a [`ReconnectPolicy`] and keeps a
//! [`NetworkSession`] snapshot for status reads.
//!
//! A join blocks the caller for up to the join timeout. That is acceptable
//! only because the application loop is single-threaded and has nothing else
//! pending while the radio associates.

use super::driver::{format_mac, WifiDriver, WifiError};
use crate::clock::Millis;
use crate::config::{ConfigError, WifiCredentials, JOIN_TIMEOUT};
use crate::reconnect::{ReconnectConfig, ReconnectPolicy};
use log::{debug, info, warn};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Returned by status getters while not connected.
pub const NOT_CONNECTED: &str = "Not connected";

/// MAC reported when the driver cannot provide one.
const UNKNOWN_MAC: &str = "00:00:00:00:00:00";

/// Connection snapshot. `ip_address` and `signal_strength` are only
/// populated while `connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSession {
    /// Whether the last join succeeded and no loss was seen since.
    pub connected: bool,
    /// Configured network name.
    pub ssid: String,
    /// Station address while connected.
    pub ip_address: Option<Ipv4Addr>,
    /// RSSI in dBm while connected.
    pub signal_strength: Option<i32>,
}

impl NetworkSession {
    fn disconnected(ssid: &str) -> Self {
        Self {
            connected: false,
            ssid: ssid.to_string(),
            ip_address: None,
            signal_strength: None,
        }
    }
}

/// Result of a [`WifiManager::connect`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Nothing to do.
    AlreadyConnected,
    /// Join succeeded.
    Connected,
    /// The reconnect policy is backing off.
    Deferred,
    /// Join failed; recorded as a failed attempt.
    Failed(WifiError),
}

/// WiFi station manager.
pub struct WifiManager<D> {
    driver: D,
    credentials: WifiCredentials,
    policy: ReconnectPolicy,
    session: NetworkSession,
    join_timeout: Duration,
}

impl<D: WifiDriver> WifiManager<D> {
    /// Create a manager; fails if the retry limits are invalid.
    pub fn new(
        driver: D,
        credentials: WifiCredentials,
        reconnect: ReconnectConfig,
    ) -> Result<Self, ConfigError> {
        let policy = ReconnectPolicy::new(reconnect)?;
        let session = NetworkSession::disconnected(&credentials.ssid);
        Ok(Self {
            driver,
            credentials,
            policy,
            session,
            join_timeout: JOIN_TIMEOUT,
        })
    }

    /// Override the join timeout.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Join the network if the reconnect policy permits it.
    pub fn connect(&mut self, now: Millis) -> JoinOutcome {
        if self.session.connected {
            return JoinOutcome::AlreadyConnected;
        }

        if !self.policy.should_attempt(now) {
            if let Some(left) = self.policy.cooldown_remaining(now) {
                debug!("WiFi join deferred, {} ms of cooldown left", left.as_millis());
            }
            return JoinOutcome::Deferred;
        }

        info!("Connecting to WiFi: {}", self.credentials.ssid);

        let result = match self.driver.begin(&self.credentials) {
            Ok(()) => self.driver.wait_connected(self.join_timeout),
            Err(e) => Err(e),
        };

        match result {
            Ok(true) => {
                self.policy.record_attempt(now, true);
                self.refresh_session();
                info!("WiFi connected successfully!");
                info!("IP Address: {}", self.ip_address());
                info!("MAC Address: {}", self.mac_address());
                info!("Signal Strength (RSSI): {} dBm", self.rssi());
                JoinOutcome::Connected
            }
            Ok(false) => self.join_failed(
                now,
                WifiError::JoinTimeout {
                    timeout: self.join_timeout,
                },
            ),
            Err(e) => self.join_failed(now, e),
        }
    }

    /// Detect link loss and retry the join when disconnected.
    ///
    /// Returns the join outcome when a join was considered this call.
    pub fn poll(&mut self, now: Millis) -> Option<JoinOutcome> {
        let link_up = self.driver.is_connected();

        if self.session.connected {
            if link_up {
                if let Some(rssi) = self.driver.rssi() {
                    self.session.signal_strength = Some(i32::from(rssi));
                }
                return None;
            }
            warn!("WiFi connection lost!");
            self.clear_session();
            self.policy.mark_disconnected();
        } else if link_up {
            // Driver re-associated on its own
            info!("WiFi link is up, adopting session");
            self.policy.record_attempt(now, true);
            self.refresh_session();
            return None;
        }

        Some(self.connect(now))
    }

    /// Drop the current association.
    pub fn disconnect(&mut self) -> Result<(), WifiError> {
        if !self.session.connected {
            return Ok(());
        }
        info!("Disconnecting from WiFi...");
        self.driver.disconnect()?;
        self.clear_session();
        self.policy.mark_disconnected();
        info!("WiFi disconnected");
        Ok(())
    }

    /// Whether both the session and the driver report a live link.
    pub fn is_connected(&self) -> bool {
        self.session.connected && self.driver.is_connected()
    }

    /// Station IP, or `"Not connected"`.
    pub fn ip_address(&self) -> String {
        match (self.is_connected(), self.session.ip_address) {
            (true, Some(ip)) => ip.to_string(),
            _ => NOT_CONNECTED.to_string(),
        }
    }

    /// Network name, or `"Not connected"`.
    pub fn ssid(&self) -> String {
        if self.is_connected() {
            self.session.ssid.clone()
        } else {
            NOT_CONNECTED.to_string()
        }
    }

    /// RSSI in dBm, or `0` when not connected.
    pub fn rssi(&self) -> i32 {
        if !self.is_connected() {
            return 0;
        }
        self.driver
            .rssi()
            .map(i32::from)
            .or(self.session.signal_strength)
            .unwrap_or(0)
    }

    /// Station MAC address.
    pub fn mac_address(&self) -> String {
        self.driver
            .mac_address()
            .map(|mac| format_mac(&mac))
            .unwrap_or_else(|| UNKNOWN_MAC.to_string())
    }

    /// Connection snapshot.
    pub fn session(&self) -> &NetworkSession {
        &self.session
    }

    /// Retry bookkeeping.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Access the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn join_failed(&mut self, now: Millis, err: WifiError) -> JoinOutcome {
        self.policy.record_attempt(now, false);
        let max = self.policy.config().max_attempts;

        warn!("WiFi connection failed: {}", err);
        info!("Connection attempt {} of {}", self.policy.attempts(), max);
        if self.policy.remaining_attempts() == 0 {
            warn!(
                "Maximum connection attempts reached. Will retry in {} seconds.",
                self.policy.config().cooldown.as_secs()
            );
        }

        JoinOutcome::Failed(err)
    }

    fn refresh_session(&mut self) {
        self.session = NetworkSession {
            connected: true,
            ssid: self
                .driver
                .ssid()
                .unwrap_or_else(|| self.credentials.ssid.clone()),
            ip_address: self.driver.ip_address(),
            signal_strength: self.driver.rssi().map(i32::from),
        };
    }

    fn clear_session(&mut self) {
        self.session = NetworkSession::disconnected(&self.credentials.ssid);
    }
}
