//! Canonical JSON payload shapes exchanged with the control server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigErrorCode, Severity};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Marginal,
    Invalid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorReading {
    pub esp_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    /// `None` for bus-addressed sensors (I2C) that don't own a GPIO.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpio: Option<u8>,
    pub sensor_type: String,
    pub raw: f64,
    pub value: f64,
    pub unit: String,
    pub quality: Quality,
    pub ts: u64,
    pub raw_mode: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secondary: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SensorBatch {
    pub readings: Vec<SensorReading>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Heartbeat {
    pub esp_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_zone_id: Option<String>,
    pub zone_assigned: bool,
    pub ts: u64,
    pub uptime: u64,
    /// Must stay exactly `heap_free` for server compatibility.
    pub heap_free: u32,
    pub wifi_rssi: i8,
    pub sensor_count: usize,
    pub actuator_count: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActuatorCommandKind {
    On,
    Off,
    Pwm,
    Toggle,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub command: ActuatorCommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default)]
    pub duration: u32,
    pub timestamp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActuatorStatus {
    pub state: String,
    pub value: f64,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActuatorResponse {
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActuatorAlert {
    pub reason: String,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WillPayload {
    pub status: String,
    pub ts: u64,
}

impl WillPayload {
    pub fn offline(ts: u64) -> Self {
        Self {
            status: "offline".to_string(),
            ts,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemErrorPayload {
    pub code: u16,
    pub severity: Severity,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpio: Option<u8>,
    pub message: String,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticsPayload {
    pub errors: Vec<SystemErrorPayload>,
    pub ts: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigResponseStatus {
    Success,
    PartialSuccess,
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigItemError {
    pub item: String,
    pub code: ConfigErrorCode,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub status: ConfigResponseStatus,
    #[serde(default)]
    pub errors: Vec<ConfigItemError>,
    pub ts: u64,
}

/// A single item from a `.../config` push, tagged by which persisted
/// namespace it targets. Mirrors `trabajante_persistence`'s
/// `SensorConfig`/`ActuatorConfig`/`ZoneConfig` field-for-field, but
/// can't reuse those types directly: this crate has no dependency on
/// `trabajante-persistence`, and shouldn't grow one just for a wire
/// shape. `Application::handle_config` maps each variant's fields onto
/// the matching persisted config struct by hand, the same way it
/// already builds a `ZoneConfig` out of a `ZoneAssignRequest`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum ConfigPushRequest {
    Sensor {
        #[serde(default)]
        gpio: Option<u8>,
        sensor_type: String,
        interface: String,
        #[serde(default)]
        i2c_address: Option<u8>,
        #[serde(default)]
        onewire_rom: Option<String>,
        sampling_interval_seconds: u64,
        #[serde(default)]
        provided_values: Vec<String>,
        #[serde(default = "default_true")]
        active: bool,
        #[serde(default = "default_true")]
        raw_mode: bool,
    },
    Actuator {
        gpio: u8,
        actuator_type: String,
        #[serde(default)]
        max_runtime_seconds: u64,
        #[serde(default)]
        inverted: bool,
    },
    Zone {
        zone_id: String,
        master_zone_id: String,
        zone_name: String,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneAssignRequest {
    pub zone_id: String,
    pub master_zone_id: String,
    pub zone_name: String,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZoneAck {
    pub zone_id: String,
    pub status: String,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubzoneAssignRequest {
    pub subzone_id: String,
    pub parent_zone_id: String,
    pub gpios: Vec<u8>,
    pub ts: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubzoneAck {
    pub subzone_id: String,
    pub status: String,
    pub ts: u64,
}
