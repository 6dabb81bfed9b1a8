//! WiFi connection management (spec §4.6).

use log::{info, warn};
use trabajante_proto::ErrorCode;

use crate::backoff::Backoff;

/// Abstracts the platform WiFi driver's state machine so the retry policy
/// here is testable without a radio. `trabajante-firmware` implements
/// this over `esp_idf_svc::wifi::EspWifi`.
pub trait WifiTransport {
    fn connect(&mut self, ssid: &str, password: &str) -> Result<(), ErrorCode>;
    fn rssi(&self) -> i8;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WifiState {
    Disconnected,
    Connected,
}

pub struct WifiManager<T: WifiTransport> {
    transport: T,
    backoff: Backoff,
    state: WifiState,
    next_attempt_at: u64,
}

impl<T: WifiTransport> WifiManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            backoff: Backoff::new(),
            state: WifiState::Disconnected,
            next_attempt_at: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    /// Tries a connection if `now` has reached the scheduled retry time;
    /// a no-op otherwise. Reports `WIFI_CONNECT_FAILED` on failure and
    /// schedules the next attempt per the exponential backoff.
    pub fn tick(&mut self, ssid: &str, password: &str, now: u64) -> Result<(), ErrorCode> {
        if self.state == WifiState::Connected || now < self.next_attempt_at {
            return Ok(());
        }
        match self.transport.connect(ssid, password) {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff.reset();
                info!("wifi: connected to {ssid}");
                Ok(())
            }
            Err(err) => {
                let delay = self.backoff.advance();
                self.next_attempt_at = now + delay;
                warn!("wifi: connect to {ssid} failed ({err}), retry in {delay}s");
                Err(ErrorCode::WifiConnectFailed)
            }
        }
    }

    pub fn on_disconnected(&mut self) {
        self.state = WifiState::Disconnected;
    }

    pub fn rssi(&self) -> i8 {
        self.transport.rssi()
    }
}
