//! Bounded-retry reconnect policy.
//!
//! Limits how often a radio operation (WiFi join, BLE advertising restart) is
//! retried: a fixed number of attempts, then a fixed cooldown before the
//! counter resets.
//!
//! # State machine
//!
//! ```text
//! Idle ──should_attempt──▶ Attempting ──success──▶ Connected
//!  ▲                           │                      │
//!  └──failure (attempts left)──┤                      │
//!                              └──failure (exhausted)──▶ Backoff
//! Backoff ──cooldown elapsed──▶ Attempting
//! Connected ──mark_disconnected──▶ Idle
//! ```
//!
//! # Example
//!
//! ```
//! use esp32_sensor_node::reconnect::{ReconnectConfig, ReconnectPolicy};
//!
//! let mut policy = ReconnectPolicy::new(ReconnectConfig::default()).unwrap();
//! for _ in 0..3 {
//!     assert!(policy.should_attempt(0));
//!     policy.record_attempt(0, false);
//! }
//! assert!(!policy.should_attempt(29_999));
//! assert!(policy.should_attempt(30_000));
//! assert_eq!(policy.attempts(), 0);
//! ```

use crate::clock::{as_millis, elapsed_ms, Millis};
use crate::config::{ConfigError, JOIN_COOLDOWN, MAX_JOIN_ATTEMPTS};
use log::debug;
use std::time::Duration;

/// Retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Failed attempts allowed before entering backoff. Must be at least 1.
    pub max_attempts: u32,
    /// Wait after the last attempt before the counter resets.
    pub cooldown: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_JOIN_ATTEMPTS,
            cooldown: JOIN_COOLDOWN,
        }
    }
}

impl ReconnectConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be >= 1"));
        }
        Ok(())
    }
}

/// Where the policy currently is in its retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// No attempt in flight, attempts remain.
    Idle,
    /// An attempt was permitted and has not been recorded yet.
    Attempting,
    /// Last attempt succeeded.
    Connected,
    /// Attempts exhausted, waiting for the cooldown.
    Backoff,
}

/// Bounded-retry state machine.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
    last_attempt: Option<Millis>,
    phase: ReconnectPhase,
}

impl ReconnectPolicy {
    /// Create a policy, rejecting `max_attempts == 0`.
    pub fn new(config: ReconnectConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            attempts: 0,
            last_attempt: None,
            phase: ReconnectPhase::Idle,
        })
    }

    /// Check whether a new attempt is permitted at `now`.
    ///
    /// Resets the attempt counter as a side effect once the cooldown since
    /// the last attempt has elapsed.
    pub fn should_attempt(&mut self, now: Millis) -> bool {
        if let Some(last) = self.last_attempt {
            if elapsed_ms(now, last) >= as_millis(self.config.cooldown) && self.attempts > 0 {
                debug!("Reconnect cooldown elapsed, resetting {} attempt(s)", self.attempts);
                self.attempts = 0;
            }
        }

        if self.attempts < self.config.max_attempts {
            self.phase = ReconnectPhase::Attempting;
            true
        } else {
            self.phase = ReconnectPhase::Backoff;
            false
        }
    }

    /// Record the outcome of an attempt started at `now`.
    pub fn record_attempt(&mut self, now: Millis, succeeded: bool) {
        self.last_attempt = Some(now);

        if succeeded {
            self.attempts = 0;
            self.phase = ReconnectPhase::Connected;
            return;
        }

        self.attempts = (self.attempts + 1).min(self.config.max_attempts);
        self.phase = if self.attempts >= self.config.max_attempts {
            ReconnectPhase::Backoff
        } else {
            ReconnectPhase::Idle
        };
    }

    /// Note that an established connection was lost.
    pub fn mark_disconnected(&mut self) {
        if self.phase == ReconnectPhase::Connected {
            self.phase = ReconnectPhase::Idle;
        }
    }

    /// Failed attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts left before backoff.
    pub fn remaining_attempts(&self) -> u32 {
        self.config.max_attempts - self.attempts
    }

    /// Current phase.
    pub fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    /// Timestamp of the last recorded attempt.
    pub fn last_attempt(&self) -> Option<Millis> {
        self.last_attempt
    }

    /// Time left until the cooldown expires, `None` if not backing off.
    pub fn cooldown_remaining(&self, now: Millis) -> Option<Duration> {
        if self.attempts < self.config.max_attempts {
            return None;
        }
        let last = self.last_attempt?;
        let cooldown = as_millis(self.config.cooldown);
        let elapsed = elapsed_ms(now, last);
        if elapsed >= cooldown {
            None
        } else {
            Some(Duration::from_millis(cooldown - elapsed))
        }
    }

    /// The configured limits.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }
}

impl Default for ReconnectPolicy {
    /// Policy with [`ReconnectConfig::default`] limits.
    fn default() -> Self {
        Self {
            config: ReconnectConfig::default(),
            attempts: 0,
            last_attempt: None,
            phase: ReconnectPhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Millis = 50_000;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(ReconnectConfig::default()).unwrap()
    }

    fn exhaust(policy: &mut ReconnectPolicy, at: Millis) {
        for _ in 0..policy.config().max_attempts {
            assert!(policy.should_attempt(at));
            policy.record_attempt(at, false);
        }
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let config = ReconnectConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            ReconnectPolicy::new(config),
            Err(ConfigError::InvalidConfigValue { name: "max_attempts", .. })
        ));
    }

    #[test]
    fn test_fresh_policy_allows_attempt() {
        let mut policy = policy();
        assert_eq!(policy.phase(), ReconnectPhase::Idle);
        assert!(policy.should_attempt(0));
        assert_eq!(policy.phase(), ReconnectPhase::Attempting);
    }

    #[test]
    fn test_blocks_after_max_failures_until_cooldown() {
        let mut policy = policy();
        exhaust(&mut policy, T);

        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.phase(), ReconnectPhase::Backoff);
        assert!(!policy.should_attempt(T + 1));
        assert!(!policy.should_attempt(T + 29_999));
        assert_eq!(policy.attempts(), 3);

        assert!(policy.should_attempt(T + 30_000));
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn test_cooldown_scenario_resets_attempts() {
        let mut policy = policy();
        exhaust(&mut policy, T);

        assert!(policy.should_attempt(T + 30_001));
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.phase(), ReconnectPhase::Attempting);
    }

    #[test]
    fn test_failure_below_limit_returns_to_idle() {
        let mut policy = policy();
        assert!(policy.should_attempt(0));
        policy.record_attempt(0, false);
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.remaining_attempts(), 2);
        assert_eq!(policy.phase(), ReconnectPhase::Idle);
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut policy = policy();
        policy.record_attempt(0, false);
        policy.record_attempt(100, false);
        policy.record_attempt(200, true);

        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.phase(), ReconnectPhase::Connected);
        assert_eq!(policy.last_attempt(), Some(200));
    }

    #[test]
    fn test_attempts_never_exceed_max() {
        let mut policy = policy();
        for i in 0..10 {
            policy.record_attempt(i, false);
        }
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.remaining_attempts(), 0);
    }

    #[test]
    fn test_single_attempt_per_window() {
        let config = ReconnectConfig {
            max_attempts: 1,
            cooldown: Duration::from_millis(1000),
        };
        let mut policy = ReconnectPolicy::new(config).unwrap();

        assert!(policy.should_attempt(0));
        policy.record_attempt(0, false);
        assert!(!policy.should_attempt(999));
        assert!(policy.should_attempt(1000));
    }

    #[test]
    fn test_mark_disconnected() {
        let mut policy = policy();
        policy.record_attempt(0, true);
        policy.mark_disconnected();
        assert_eq!(policy.phase(), ReconnectPhase::Idle);
        assert!(policy.should_attempt(10));
    }

    #[test]
    fn test_cooldown_remaining() {
        let mut policy = policy();
        assert_eq!(policy.cooldown_remaining(0), None);

        exhaust(&mut policy, T);
        assert_eq!(
            policy.cooldown_remaining(T + 10_000),
            Some(Duration::from_millis(20_000))
        );
        assert_eq!(policy.cooldown_remaining(T + 30_000), None);
    }
}
