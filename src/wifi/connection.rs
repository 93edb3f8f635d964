//! ESP-IDF WiFi station driver.
//!
//! Implements [`WifiDriver`] on top of `BlockingWifi<EspWifi>`. The join is
//! split into a non-blocking `connect` plus a bounded wait so the manager
//! controls the timeout instead of relying on the IDF defaults.

use super::driver::{remaining_budget, WifiDriver, WifiError};
use crate::config::WifiCredentials;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use esp_idf_sys::{
    esp, esp_err_t, esp_wifi_sta_get_ap_info, wifi_ap_record_t, EspError, ESP_ERR_TIMEOUT,
};
use log::{debug, info};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// WiFi station driver for ESP32.
pub struct EspWifiDriver<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
}

impl<'a> EspWifiDriver<'a> {
    /// Take the modem and put the radio in station mode.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, WifiError> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
        wifi.start()?;
        // Drop any association left over from before a soft reset
        let _ = wifi.disconnect();

        info!("WiFi Manager initialized");
        Ok(Self { wifi })
    }

    fn ap_info(&self) -> Option<wifi_ap_record_t> {
        let mut record = wifi_ap_record_t::default();
        // SAFETY: `record` is a valid, writable out-parameter for the call.
        esp!(unsafe { esp_wifi_sta_get_ap_info(&mut record) }).ok()?;
        Some(record)
    }
}

impl WifiDriver for EspWifiDriver<'_> {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), WifiError> {
        let auth_method = if credentials.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let config = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidSsid)?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| WifiError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&config)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }

        // Non-blocking connect on the inner driver, the wait happens below
        self.wifi.wifi_mut().connect()?;
        Ok(())
    }

    fn wait_connected(&mut self, timeout: Duration) -> Result<bool, WifiError> {
        let started = Instant::now();
        let wifi = &self.wifi;
        match wifi.wifi_wait_while(|| wifi.is_connected().map(|c| !c), Some(timeout)) {
            Ok(()) => {}
            Err(e) if is_timeout(&e) => {
                debug!("WiFi association timed out");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        // Associated; DHCP gets whatever is left of the same budget
        let Some(left) = remaining_budget(timeout, started.elapsed()) else {
            debug!("WiFi join budget spent before DHCP");
            return Ok(false);
        };
        match wifi.ip_wait_while(|| wifi.wifi().is_up().map(|up| !up), Some(left)) {
            Ok(()) => Ok(true),
            Err(e) if is_timeout(&e) => {
                debug!("DHCP timed out");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn disconnect(&mut self) -> Result<(), WifiError> {
        self.wifi.disconnect()?;
        Ok(())
    }

    fn ip_address(&self) -> Option<Ipv4Addr> {
        if !self.is_connected() {
            return None;
        }
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }

    fn rssi(&self) -> Option<i8> {
        self.ap_info().map(|record| record.rssi)
    }

    fn ssid(&self) -> Option<String> {
        let record = self.ap_info()?;
        let len = record
            .ssid
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(record.ssid.len());
        String::from_utf8(record.ssid[..len].to_vec()).ok()
    }

    fn mac_address(&self) -> Option<[u8; 6]> {
        self.wifi.wifi().sta_netif().get_mac().ok()
    }
}

fn is_timeout(e: &EspError) -> bool {
    e.code() == ESP_ERR_TIMEOUT as esp_err_t
}
