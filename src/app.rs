//! Cooperative application loop.
//!
//! [`App`] owns every manager and advances them in a fixed order on each
//! [`tick`](App::tick):
//!
//! 1. WiFi poll (join, loss detection, retry)
//! 2. BLE events (attach/detach, characteristic writes)
//! 3. sensor sampling
//! 4. sensor values into the GATT characteristics
//! 5. sensor notification, at most every 30 s
//! 6. link poll (edges, re-advertising, counter)
//! 7. LED blink
//!
//! WiFi and BLE are optional so the binary can run with either disabled.

use crate::ble::{LinkEvent, LinkTransport, PeripheralLink};
use crate::clock::{as_millis, elapsed_ms, Clock, Millis};
use crate::config::{BLINK_PERIOD, LOOP_INTERVAL, SENSOR_NOTIFY_INTERVAL};
use crate::led::LedController;
use crate::sensor::{TemperatureService, TemperatureUnit};
use crate::wifi::{WifiDriver, WifiManager};
use embedded_hal::digital::StatefulOutputPin;
use log::{debug, error, info, warn};

/// The firmware: LED, optional WiFi, sensor and optional BLE link.
pub struct App<P, D, T> {
    led: LedController<P>,
    wifi: Option<WifiManager<D>>,
    sensor: TemperatureService,
    link: Option<PeripheralLink<T>>,
    last_blink: Millis,
    last_sensor_notify: Millis,
}

impl<P, D, T> App<P, D, T>
where
    P: StatefulOutputPin,
    D: WifiDriver,
    T: LinkTransport,
{
    /// Assemble the app with neither WiFi nor BLE.
    pub fn new(led: LedController<P>, sensor: TemperatureService, now: Millis) -> Self {
        Self {
            led,
            wifi: None,
            sensor,
            link: None,
            last_blink: now,
            last_sensor_notify: now,
        }
    }

    /// Enable the network join manager.
    pub fn with_wifi(mut self, wifi: WifiManager<D>) -> Self {
        self.wifi = Some(wifi);
        self
    }

    /// Enable the BLE peripheral link.
    pub fn with_link(mut self, link: PeripheralLink<T>) -> Self {
        self.link = Some(link);
        self
    }

    /// Run one loop iteration at `now`.
    pub fn tick(&mut self, now: Millis) {
        if let Some(wifi) = self.wifi.as_mut() {
            wifi.poll(now);
        }

        self.dispatch_link_events();

        self.sensor.update(now);

        if let Some(link) = self.link.as_mut() {
            link.push_sensor_values(&self.sensor.reading());

            if elapsed_ms(now, self.last_sensor_notify) >= as_millis(SENSOR_NOTIFY_INTERVAL)
                && link.notify_sensor_values()
            {
                self.last_sensor_notify = now;
            }

            link.poll(now);
        }

        if elapsed_ms(now, self.last_blink) >= as_millis(BLINK_PERIOD) {
            match self.led.toggle() {
                Ok(level) => debug!("LED {}", if level { "ON" } else { "OFF" }),
                Err(e) => error!("LED toggle failed: {}", e),
            }
            self.last_blink = now;
        }
    }

    /// Tick forever, sleeping between iterations.
    pub fn run<C: Clock>(&mut self, clock: &C) -> ! {
        info!("Entering main loop");
        loop {
            self.tick(clock.now_ms());
            std::thread::sleep(LOOP_INTERVAL);
        }
    }

    /// LED controller.
    pub fn led(&self) -> &LedController<P> {
        &self.led
    }

    /// Mutable LED controller.
    pub fn led_mut(&mut self) -> &mut LedController<P> {
        &mut self.led
    }

    /// Network join manager, when enabled.
    pub fn wifi(&self) -> Option<&WifiManager<D>> {
        self.wifi.as_ref()
    }

    /// Temperature service.
    pub fn sensor(&self) -> &TemperatureService {
        &self.sensor
    }

    /// BLE link, when enabled.
    pub fn link(&self) -> Option<&PeripheralLink<T>> {
        self.link.as_ref()
    }

    fn dispatch_link_events(&mut self) {
        let events = match self.link.as_mut() {
            Some(link) => link.take_events(),
            None => return,
        };

        for event in events {
            match event {
                // Already applied to the link's connection flag
                LinkEvent::Attached | LinkEvent::Detached => {}
                LinkEvent::CounterWritten(data) => {
                    info!("Counter written by client: {}", String::from_utf8_lossy(&data));
                }
                LinkEvent::UnitConfigWritten(data) => {
                    match TemperatureUnit::from_config_bytes(&data) {
                        Ok(unit) => self.sensor.set_unit(unit),
                        Err(e) => warn!("Ignoring unit config write: {}", e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::{EventInbox, SensorPayload};
    use crate::clock::ManualClock;
    use crate::config::WifiCredentials;
    use crate::reconnect::ReconnectConfig;
    use crate::sensor::SyntheticSource;
    use crate::sim::{SimOutputPin, SimTransport, SimWifiDriver};
    use std::time::Duration;

    type TestApp = App<SimOutputPin, SimWifiDriver, SimTransport>;

    fn app() -> TestApp {
        let led = LedController::init(48, SimOutputPin::new()).unwrap();
        let sensor = TemperatureService::new(SyntheticSource::default(), 0);
        App::new(led, sensor, 0)
    }

    fn app_with_link() -> (TestApp, EventInbox) {
        let transport = SimTransport::new();
        let inbox = transport.inbox();
        (app().with_link(PeripheralLink::new(transport)), inbox)
    }

    fn run(app: &mut TestApp, from: Millis, to: Millis) {
        for now in (from..=to).step_by(100) {
            app.tick(now);
        }
    }

    #[test]
    fn test_led_toggles_once_per_period() {
        let mut app = app();
        let initial_writes = app.led_mut().driver_mut().writes();

        run(&mut app, 0, 3_050);
        assert_eq!(app.led_mut().driver_mut().writes() - initial_writes, 3);
        assert!(app.led().level());
    }

    #[test]
    fn test_blink_follows_clock() {
        let clock = ManualClock::new(0);
        let mut app = app();

        app.tick(clock.now_ms());
        clock.advance(Duration::from_millis(999));
        app.tick(clock.now_ms());
        assert!(!app.led().level());

        clock.advance(Duration::from_millis(1));
        app.tick(clock.now_ms());
        assert!(app.led().level());
    }

    #[test]
    fn test_runs_without_optional_subsystems() {
        let mut app = app();
        run(&mut app, 0, 1_000);
        assert!(app.wifi().is_none());
        assert!(app.link().is_none());
    }

    #[test]
    fn test_wifi_retries_are_bounded() {
        let creds = WifiCredentials::new("TestNetwork", "password123").unwrap();
        let wifi = WifiManager::new(SimWifiDriver::unreachable(), creds, ReconnectConfig::default())
            .unwrap();
        let mut app = app().with_wifi(wifi);

        run(&mut app, 0, 29_900);
        assert_eq!(app.wifi().unwrap().driver().joins(), 3);

        // Cooldown measured from the third attempt at 200 ms
        run(&mut app, 30_000, 30_200);
        assert_eq!(app.wifi().unwrap().driver().joins(), 4);
    }

    #[test]
    fn test_wifi_connects_on_first_tick() {
        let creds = WifiCredentials::new("TestNetwork", "password123").unwrap();
        let wifi = WifiManager::new(SimWifiDriver::reachable(), creds, ReconnectConfig::default())
            .unwrap();
        let mut app = app().with_wifi(wifi);

        app.tick(0);
        assert!(app.wifi().unwrap().is_connected());
        assert_eq!(app.wifi().unwrap().ip_address(), "192.168.1.42");
    }

    #[test]
    fn test_attach_event_starts_counter() {
        let (mut app, inbox) = app_with_link();
        inbox.push(LinkEvent::Attached);

        run(&mut app, 0, 6_000);
        let link = app.link().unwrap();
        assert_eq!(link.sessions(), 1);
        assert_eq!(
            link.transport().counter_payloads(),
            vec!["Count: 1", "Count: 2", "Count: 3"]
        );
    }

    #[test]
    fn test_sensor_values_pushed_while_attached() {
        let (mut app, inbox) = app_with_link();
        app.tick(0);
        assert_eq!(app.link().unwrap().transport().sensor_values(), None);

        inbox.push(LinkEvent::Attached);
        app.tick(100);
        assert_eq!(
            app.link().unwrap().transport().sensor_values(),
            Some(SensorPayload::from_reading(&app.sensor().reading()))
        );
    }

    #[test]
    fn test_sensor_notify_cadence() {
        let (mut app, inbox) = app_with_link();
        inbox.push(LinkEvent::Attached);

        run(&mut app, 0, 29_900);
        assert_eq!(app.link().unwrap().transport().sensor_notifications(), 0);

        run(&mut app, 30_000, 65_000);
        assert_eq!(app.link().unwrap().transport().sensor_notifications(), 2);
    }

    #[test]
    fn test_no_sensor_notify_while_detached() {
        let (mut app, _inbox) = app_with_link();
        run(&mut app, 0, 65_000);
        let transport = app.link().unwrap().transport();
        assert_eq!(transport.sensor_notifications(), 0);
        assert_eq!(transport.sensor_writes(), 0);
    }

    #[test]
    fn test_unit_write_converts_sensor() {
        let (mut app, inbox) = app_with_link();
        let celsius = app.sensor().current();

        inbox.push(LinkEvent::UnitConfigWritten(vec![1]));
        app.tick(100);
        assert_eq!(app.sensor().unit(), TemperatureUnit::Fahrenheit);
        assert!((app.sensor().current() - (celsius * 9.0 / 5.0 + 32.0)).abs() < 0.01);
    }

    #[test]
    fn test_invalid_unit_write_ignored() {
        let (mut app, inbox) = app_with_link();
        let before = app.sensor().reading();

        inbox.push(LinkEvent::UnitConfigWritten(vec![7]));
        inbox.push(LinkEvent::UnitConfigWritten(vec![]));
        inbox.push(LinkEvent::UnitConfigWritten(vec![1, 0]));
        app.tick(100);
        assert_eq!(app.sensor().reading(), before);
    }

    #[test]
    fn test_detach_schedules_readvertise() {
        let (mut app, inbox) = app_with_link();
        inbox.push(LinkEvent::Attached);
        run(&mut app, 0, 1_000);

        inbox.push(LinkEvent::Detached);
        run(&mut app, 1_100, 3_000);
        let link = app.link().unwrap();
        assert!(!link.is_attached());
        assert_eq!(link.transport().advertising_restarts(), 1);
    }
}
