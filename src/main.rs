//! ESP32 sensor node firmware binary.
//!
//! Blinks the status LED, joins WiFi (feature `wifi`) and serves the BLE
//! counter and temperature services (feature `ble`). The host build runs the
//! same loop over simulated drivers with a scripted BLE central.

use esp32_sensor_node::clock::{Clock, SystemClock};
use log::info;

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // SAFETY: returns a pointer to a static NUL-terminated string.
    let version = unsafe { std::ffi::CStr::from_ptr(esp_idf_sys::esp_get_idf_version()) };
    info!("ESP-IDF {} initialized", version.to_string_lossy());
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn main() {
    platform_init();
    info!("=== ESP32 sensor node starting ===");

    let clock = SystemClock::new();
    match platform::start(&clock) {
        Ok(mut app) => app.run(&clock),
        Err(e) => log::error!("Startup failed: {}", e),
    }
}

#[cfg(feature = "esp32")]
mod platform {
    use super::*;
    use esp32_sensor_node::ble::GattServer;
    use esp32_sensor_node::led::{open_output, EspOutputPin, LedController};
    use esp32_sensor_node::sensor::{SyntheticSource, TemperatureService};
    use esp32_sensor_node::wifi::EspWifiDriver;
    use esp32_sensor_node::App;
    use esp_idf_hal::gpio::OutputPin;
    use esp_idf_hal::peripherals::Peripherals;
    use std::error::Error;

    pub type DeviceApp = App<EspOutputPin, EspWifiDriver<'static>, GattServer>;

    pub fn start(clock: &SystemClock) -> Result<DeviceApp, Box<dyn Error>> {
        let peripherals = Peripherals::take()?;

        // A dead status LED aborts startup
        let (pin, driver) = open_output(peripherals.pins.gpio48.downgrade_output())?;
        let led = LedController::init(pin, driver)?;

        let now = clock.now_ms();
        let sensor = TemperatureService::new(SyntheticSource::default(), now);
        let app = App::new(led, sensor, now);

        #[cfg(feature = "wifi")]
        let app = with_wifi(app, peripherals.modem);

        #[cfg(feature = "ble")]
        let app = with_ble(app);

        Ok(app)
    }

    #[cfg(feature = "wifi")]
    fn with_wifi(app: DeviceApp, modem: esp_idf_hal::modem::Modem) -> DeviceApp {
        use esp32_sensor_node::config::WifiCredentials;
        use esp32_sensor_node::reconnect::ReconnectConfig;
        use esp32_sensor_node::wifi::WifiManager;
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;

        let build = || -> Result<WifiManager<EspWifiDriver<'static>>, Box<dyn Error>> {
            let credentials = WifiCredentials::from_build_env()?;
            let sysloop = EspSystemEventLoop::take()?;
            let nvs = EspDefaultNvsPartition::take().ok();
            let driver = EspWifiDriver::new(modem, sysloop, nvs)?;
            Ok(WifiManager::new(
                driver,
                credentials,
                ReconnectConfig::default(),
            )?)
        };

        match build() {
            Ok(wifi) => app.with_wifi(wifi),
            Err(e) => {
                log::warn!("WiFi disabled: {}", e);
                app
            }
        }
    }

    #[cfg(feature = "ble")]
    fn with_ble(app: DeviceApp) -> DeviceApp {
        use esp32_sensor_node::ble::PeripheralLink;

        let reading = app.sensor().reading();
        match GattServer::start(reading.unit) {
            Ok(server) => {
                info!("Waiting a client connection to notify...");
                app.with_link(PeripheralLink::new(server).with_sensor_values(&reading))
            }
            Err(e) => {
                log::error!("BLE disabled: {}", e);
                app
            }
        }
    }
}

#[cfg(not(feature = "esp32"))]
mod platform {
    use super::*;
    use esp32_sensor_node::config::BLINK_GPIO;
    use esp32_sensor_node::led::LedController;
    use esp32_sensor_node::sensor::{SyntheticSource, TemperatureService};
    use esp32_sensor_node::sim::{SimOutputPin, SimTransport, SimWifiDriver};
    use esp32_sensor_node::App;
    use std::error::Error;

    pub type HostApp = App<SimOutputPin, SimWifiDriver, SimTransport>;

    pub fn start(clock: &SystemClock) -> Result<HostApp, Box<dyn Error>> {
        let led = LedController::init(BLINK_GPIO, SimOutputPin::new())?;

        let now = clock.now_ms();
        let sensor = TemperatureService::new(SyntheticSource::default(), now);
        let app = App::new(led, sensor, now);

        #[cfg(feature = "wifi")]
        let app = {
            use esp32_sensor_node::config::WifiCredentials;
            use esp32_sensor_node::reconnect::ReconnectConfig;
            use esp32_sensor_node::wifi::WifiManager;

            let credentials = WifiCredentials::from_build_env()?;
            app.with_wifi(WifiManager::new(
                SimWifiDriver::reachable(),
                credentials,
                ReconnectConfig::default(),
            )?)
        };

        #[cfg(feature = "ble")]
        let app = {
            use esp32_sensor_node::ble::PeripheralLink;

            let transport = SimTransport::new();
            spawn_central(transport.inbox());
            let reading = app.sensor().reading();
            app.with_link(PeripheralLink::new(transport).with_sensor_values(&reading))
        };

        Ok(app)
    }

    /// Play a central that connects, switches to Fahrenheit and leaves.
    #[cfg(feature = "ble")]
    fn spawn_central(inbox: esp32_sensor_node::ble::EventInbox) {
        use esp32_sensor_node::ble::LinkEvent;
        use std::thread;
        use std::time::Duration;

        let script = [
            (Duration::from_secs(2), LinkEvent::Attached),
            (Duration::from_secs(5), LinkEvent::CounterWritten(b"hello".to_vec())),
            (Duration::from_secs(5), LinkEvent::UnitConfigWritten(vec![1])),
            (Duration::from_secs(25), LinkEvent::Detached),
        ];

        thread::spawn(move || {
            for (delay, event) in script {
                thread::sleep(delay);
                info!("sim central: {:?}", event);
                inbox.push(event);
            }
        });
    }
}
