//! `WifiTransport` over `esp-idf-svc`'s blocking WiFi driver.

use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use trabajante_comms::WifiTransport;
use trabajante_proto::ErrorCode;

pub struct EspWifiTransport<'d> {
    wifi: BlockingWifi<EspWifi<'d>>,
}

impl<'d> EspWifiTransport<'d> {
    pub fn new(wifi: BlockingWifi<EspWifi<'d>>) -> Self {
        Self { wifi }
    }
}

impl<'d> WifiTransport for EspWifiTransport<'d> {
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), ErrorCode> {
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| ErrorCode::WifiConnectFailed)?,
            password: password
                .try_into()
                .map_err(|_| ErrorCode::WifiConnectFailed)?,
            auth_method: AuthMethod::WPA2Personal,
            ..Default::default()
        });

        self.wifi
            .set_configuration(&config)
            .map_err(|_| ErrorCode::WifiConnectFailed)?;
        self.wifi.start().map_err(|_| ErrorCode::WifiConnectFailed)?;
        self.wifi
            .connect()
            .map_err(|_| ErrorCode::WifiConnectTimeout)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| ErrorCode::WifiConnectTimeout)
    }

    fn rssi(&self) -> i8 {
        // Heartbeat publishing must never block on radio state; fall back
        // to a neutral value rather than propagate a driver error here.
        self.wifi.wifi().get_rssi().unwrap_or(-128) as i8
    }
}
