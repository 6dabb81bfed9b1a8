//! MQTT client wrapper (spec §4.6): connect sequence, last-will, and
//! auto-reconnect with the same backoff policy as WiFi.

use log::{info, warn};
use trabajante_proto::ErrorCode;

use crate::backoff::Backoff;

/// Abstracts the platform MQTT driver. `trabajante-firmware` implements
/// this over `esp_idf_svc::mqtt::client::EspMqttClient`.
pub trait MqttTransport {
    fn connect(&mut self, client_id: &str, will_topic: &str, will_payload: &[u8]) -> Result<(), ErrorCode>;
    fn publish(&mut self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<(), ErrorCode>;
    fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), ErrorCode>;
}

/// Running counters surfaced on diagnostics so an operator can tell a
/// flapping link from a dead one.
#[derive(Clone, Debug, Default)]
pub struct ConnectionMetrics {
    pub connect_attempts: u32,
    pub connect_failures: u32,
    pub publishes_sent: u32,
    pub publishes_failed: u32,
    pub last_connected_at: Option<u64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectOutcome {
    AlreadyConnected,
    JustConnected,
    StillDisconnected,
    Failed,
}

pub struct MqttClient<T: MqttTransport> {
    transport: T,
    backoff: Backoff,
    connected: bool,
    next_attempt_at: u64,
    pub metrics: ConnectionMetrics,
}

impl<T: MqttTransport> MqttClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            backoff: Backoff::new(),
            connected: false,
            next_attempt_at: 0,
            metrics: ConnectionMetrics::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Builds the will topic/payload and attempts (re)connection if due.
    /// On a fresh connection, the caller must publish the heartbeat once
    /// and then subscribe to every inbound pattern, in that order, per
    /// spec.md §4.6's connect sequence.
    pub fn tick(&mut self, client_id: &str, will_topic: &str, will_payload: &[u8], now: u64) -> ConnectOutcome {
        if self.connected {
            return ConnectOutcome::AlreadyConnected;
        }
        if now < self.next_attempt_at {
            return ConnectOutcome::StillDisconnected;
        }

        self.metrics.connect_attempts += 1;
        match self.transport.connect(client_id, will_topic, will_payload) {
            Ok(()) => {
                self.connected = true;
                self.backoff.reset();
                self.metrics.last_connected_at = Some(now);
                info!("mqtt: connected as {client_id}");
                ConnectOutcome::JustConnected
            }
            Err(err) => {
                self.metrics.connect_failures += 1;
                let delay = self.backoff.advance();
                self.next_attempt_at = now + delay;
                warn!("mqtt: connect failed ({err}), retry in {delay}s");
                ConnectOutcome::Failed
            }
        }
    }

    pub fn on_disconnected(&mut self) {
        self.connected = false;
    }

    pub fn publish(&mut self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<(), ErrorCode> {
        if !self.connected {
            return Err(ErrorCode::MqttPublishFailed);
        }
        let result = self.transport.publish(topic, payload, qos, retain);
        if result.is_ok() {
            self.metrics.publishes_sent += 1;
        } else {
            self.metrics.publishes_failed += 1;
        }
        result
    }

    pub fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), ErrorCode> {
        self.transport.subscribe(topic, qos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeMqtt {
        fail_connects: u32,
        published: Vec<(String, Vec<u8>)>,
    }

    impl MqttTransport for FakeMqtt {
        fn connect(&mut self, _client_id: &str, _will_topic: &str, _will_payload: &[u8]) -> Result<(), ErrorCode> {
            if self.fail_connects > 0 {
                self.fail_connects -= 1;
                Err(ErrorCode::MqttPublishFailed)
            } else {
                Ok(())
            }
        }

        fn publish(&mut self, topic: &str, payload: &[u8], _qos: u8, _retain: bool) -> Result<(), ErrorCode> {
            self.published.push((topic.to_string(), payload.to_vec()));
            Ok(())
        }

        fn subscribe(&mut self, _topic: &str, _qos: u8) -> Result<(), ErrorCode> {
            Ok(())
        }
    }

    #[test]
    fn publish_while_disconnected_is_rejected() {
        let mut client = MqttClient::new(FakeMqtt {
            fail_connects: 0,
            published: vec![],
        });
        assert_eq!(
            client.publish("x", b"y", 0, false),
            Err(ErrorCode::MqttPublishFailed)
        );
    }

    #[test]
    fn connect_sequence_reports_just_connected_once() {
        let mut client = MqttClient::new(FakeMqtt {
            fail_connects: 0,
            published: vec![],
        });
        assert_eq!(
            client.tick("ESP_X", "will/topic", b"{}", 0),
            ConnectOutcome::JustConnected
        );
        assert_eq!(
            client.tick("ESP_X", "will/topic", b"{}", 1),
            ConnectOutcome::AlreadyConnected
        );
    }

    #[test]
    fn failed_connect_schedules_a_retry_via_backoff() {
        let mut client = MqttClient::new(FakeMqtt {
            fail_connects: 1,
            published: vec![],
        });
        assert_eq!(
            client.tick("ESP_X", "will/topic", b"{}", 0),
            ConnectOutcome::Failed
        );
        assert_eq!(
            client.tick("ESP_X", "will/topic", b"{}", 0),
            ConnectOutcome::StillDisconnected
        );
        assert_eq!(
            client.tick("ESP_X", "will/topic", b"{}", 1),
            ConnectOutcome::JustConnected
        );
    }

    #[test]
    fn disconnect_notification_allows_reconnect_attempts() {
        let mut client = MqttClient::new(FakeMqtt {
            fail_connects: 0,
            published: vec![],
        });
        client.tick("ESP_X", "will/topic", b"{}", 0);
        client.on_disconnected();
        assert!(!client.is_connected());
        assert_eq!(
            client.tick("ESP_X", "will/topic", b"{}", 0),
            ConnectOutcome::JustConnected
        );
    }
}
