//! `MqttTransport` over `esp-idf-svc`'s MQTT client. Inbound messages are
//! handed to the caller-supplied router rather than processed inline,
//! since the driver invokes its callback off the cooperative loop.

use std::sync::mpsc::Sender;

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};
use log::warn;
use trabajante_comms::MqttTransport;
use trabajante_proto::ErrorCode;

pub struct RawInbound {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct EspMqttTransport {
    client: EspMqttClient<'static>,
}

impl EspMqttTransport {
    /// Spawns the thread that drains `connection`'s event iterator for the
    /// lifetime of the process and forwards every `Received` message onto
    /// `inbound`, which `Application::tick()` drains each loop turn. The
    /// handler never runs on the driver's own callback thread, matching how
    /// every other inbound path in this firmware is processed only from the
    /// cooperative loop.
    ///
    /// `client_id`/`will_topic`/`will_payload` are set here because
    /// `esp-idf-svc`'s client only accepts a LWT at construction time, not
    /// on a later reconnect — unlike `MqttClient::tick()`'s abstract
    /// `connect()` call, which runs once per attempt.
    pub fn new(
        broker_url: &str,
        client_id: &str,
        will_topic: &str,
        will_payload: &[u8],
        inbound: Sender<RawInbound>,
    ) -> Result<Self, ErrorCode> {
        let config = MqttClientConfiguration {
            client_id: Some(client_id),
            lwt: Some(LwtConfiguration {
                topic: will_topic,
                payload: will_payload,
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };
        let (client, mut connection) =
            EspMqttClient::new(broker_url, &config).map_err(|_| ErrorCode::MqttPublishFailed)?;

        std::thread::spawn(move || {
            while let Some(event) = connection.next() {
                match event {
                    Ok(event) => {
                        if let EventPayload::Received {
                            topic: Some(topic),
                            data,
                            ..
                        } = event.payload()
                        {
                            let message = RawInbound {
                                topic: topic.to_string(),
                                payload: data.to_vec(),
                            };
                            if inbound.send(message).is_err() {
                                break;
                            }
                        }
                    }
                    Err(err) => warn!("mqtt connection error: {err:?}"),
                }
            }
        });

        Ok(Self { client })
    }
}

impl MqttTransport for EspMqttTransport {
    fn connect(&mut self, _client_id: &str, _will_topic: &str, _will_payload: &[u8]) -> Result<(), ErrorCode> {
        // Client id and LWT were already set for the lifetime of `client`
        // in `new()` — esp-idf-svc has no API to change them on a later
        // reconnect — so this just confirms the driver is ready to publish.
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], qos: u8, retain: bool) -> Result<(), ErrorCode> {
        let qos = match qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        };
        self.client
            .enqueue(topic, qos, retain, payload)
            .map(|_| ())
            .map_err(|_| ErrorCode::MqttPublishFailed)
    }

    fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), ErrorCode> {
        let qos = match qos {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            _ => QoS::ExactlyOnce,
        };
        self.client
            .subscribe(topic, qos)
            .map_err(|_| ErrorCode::MqttPublishFailed)
    }
}
