//! Boot-time configuration manager (spec §4.5): loads every namespace
//! into RAM-cached typed structures, validates on load, and is the sole
//! write-through path back to the `KvStore`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use trabajante_proto::ErrorCode;

use crate::store::KvStore;

/// Bumped whenever a persisted record's shape changes incompatibly. A
/// future firmware revision checks this before trusting a cached record
/// rather than silently misreading an older layout.
pub const CURRENT_SCHEMA_VERSION: u8 = 1;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ZoneConfig {
    pub zone_id: String,
    pub master_zone_id: String,
    pub zone_name: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SensorConfig {
    #[serde(default)]
    pub gpio: Option<u8>,
    pub sensor_type: String,
    pub interface: String,
    #[serde(default)]
    pub i2c_address: Option<u8>,
    #[serde(default)]
    pub onewire_rom: Option<String>,
    pub sampling_interval_seconds: u64,
    #[serde(default)]
    pub provided_values: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub raw_mode: bool,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActuatorConfig {
    pub gpio: u8,
    pub actuator_type: String,
    #[serde(default)]
    pub max_runtime_seconds: u64,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SubzoneConfig {
    pub subzone_id: String,
    pub parent_zone_id: String,
    pub gpios: Vec<u8>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u8,
}

fn default_schema_version() -> u8 {
    CURRENT_SCHEMA_VERSION
}

fn default_true() -> bool {
    true
}

/// Diagnostic view of how many records each namespace currently holds,
/// to sanity check persisted state against the "<4 KB per value" budget.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DiagnosticsSnapshot {
    pub sensor_count: usize,
    pub actuator_count: usize,
    pub subzone_count: usize,
    pub zone_assigned: bool,
    pub wifi_provisioned: bool,
}

#[derive(Default)]
pub struct ConfigManager {
    pub wifi: Option<WifiConfig>,
    pub mqtt: Option<MqttConfig>,
    pub zone: Option<ZoneConfig>,
    pub sensors: BTreeMap<u8, SensorConfig>,
    pub actuators: BTreeMap<u8, ActuatorConfig>,
    pub subzones: BTreeMap<String, SubzoneConfig>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every namespace from `store` into RAM, validating as it
    /// goes. A malformed record for one sensor/actuator does not abort
    /// the whole load; it's reported in the returned error list and that
    /// one entry is skipped.
    pub fn load(&mut self, store: &dyn KvStore) -> Vec<(String, ErrorCode)> {
        let mut errors = Vec::new();

        if let Some(raw) = store.get("wifi", "config").ok().flatten() {
            match serde_json::from_slice::<WifiConfig>(&raw) {
                Ok(cfg) => self.wifi = Some(cfg),
                Err(_) => errors.push(("wifi".to_string(), ErrorCode::ConfigInvalid)),
            }
        }

        if let Some(raw) = store.get("mqtt", "config").ok().flatten() {
            match serde_json::from_slice::<MqttConfig>(&raw) {
                Ok(cfg) => self.mqtt = Some(cfg),
                Err(_) => errors.push(("mqtt".to_string(), ErrorCode::ConfigInvalid)),
            }
        }

        if let Some(raw) = store.get("zone", "config").ok().flatten() {
            match serde_json::from_slice::<ZoneConfig>(&raw) {
                Ok(cfg) => self.zone = Some(cfg),
                Err(_) => errors.push(("zone".to_string(), ErrorCode::ConfigInvalid)),
            }
        }

        for key in store.keys("sensors") {
            match store.get("sensors", &key).ok().flatten() {
                Some(raw) => match serde_json::from_slice::<SensorConfig>(&raw) {
                    Ok(cfg) => {
                        if let Some(gpio) = cfg.gpio {
                            self.sensors.insert(gpio, cfg);
                        } else if let Ok(key_gpio) = key.parse::<u8>() {
                            self.sensors.insert(key_gpio, cfg);
                        } else {
                            errors.push((format!("sensors/{key}"), ErrorCode::ConfigMissing));
                        }
                    }
                    Err(_) => errors.push((format!("sensors/{key}"), ErrorCode::ConfigInvalid)),
                },
                None => errors.push((format!("sensors/{key}"), ErrorCode::ConfigMissing)),
            }
        }

        for key in store.keys("actuators") {
            match store.get("actuators", &key).ok().flatten() {
                Some(raw) => match serde_json::from_slice::<ActuatorConfig>(&raw) {
                    Ok(cfg) => {
                        self.actuators.insert(cfg.gpio, cfg);
                    }
                    Err(_) => errors.push((format!("actuators/{key}"), ErrorCode::ConfigInvalid)),
                },
                None => errors.push((format!("actuators/{key}"), ErrorCode::ConfigMissing)),
            }
        }

        for key in store.keys("subzones") {
            match store.get("subzones", &key).ok().flatten() {
                Some(raw) => match serde_json::from_slice::<SubzoneConfig>(&raw) {
                    Ok(cfg) => {
                        self.subzones.insert(cfg.subzone_id.clone(), cfg);
                    }
                    Err(_) => errors.push((format!("subzones/{key}"), ErrorCode::ConfigInvalid)),
                },
                None => errors.push((format!("subzones/{key}"), ErrorCode::ConfigMissing)),
            }
        }

        errors
    }

    /// Write-through set for a sensor record: the RAM cache is only
    /// updated once the store confirms the write, so a failure leaves
    /// the previous in-RAM value (or absence) intact.
    pub fn set_sensor(&mut self, store: &mut dyn KvStore, gpio: u8, cfg: SensorConfig) -> Result<(), ErrorCode> {
        let encoded = serde_json::to_vec(&cfg).map_err(|_| ErrorCode::ConfigInvalid)?;
        store.set("sensors", &gpio.to_string(), &encoded)?;
        self.sensors.insert(gpio, cfg);
        Ok(())
    }

    pub fn set_actuator(
        &mut self,
        store: &mut dyn KvStore,
        gpio: u8,
        cfg: ActuatorConfig,
    ) -> Result<(), ErrorCode> {
        let encoded = serde_json::to_vec(&cfg).map_err(|_| ErrorCode::ConfigInvalid)?;
        store.set("actuators", &gpio.to_string(), &encoded)?;
        self.actuators.insert(gpio, cfg);
        Ok(())
    }

    pub fn set_zone(&mut self, store: &mut dyn KvStore, cfg: ZoneConfig) -> Result<(), ErrorCode> {
        let encoded = serde_json::to_vec(&cfg).map_err(|_| ErrorCode::ConfigInvalid)?;
        store.set("zone", "config", &encoded)?;
        self.zone = Some(cfg);
        Ok(())
    }

    pub fn remove_sensor(&mut self, store: &mut dyn KvStore, gpio: u8) -> Result<(), ErrorCode> {
        store.remove("sensors", &gpio.to_string())?;
        self.sensors.remove(&gpio);
        Ok(())
    }

    /// `true` once provisioning has happened; the boot policy in
    /// spec.md §4.5 hinges on this flag.
    pub fn wifi_provisioned(&self) -> bool {
        self.wifi.is_some()
    }

    pub fn zone_assigned(&self) -> bool {
        self.zone.is_some()
    }

    /// Sensor and actuator configs in zone-deterministic order (ascending
    /// GPIO), the order spec.md §4.5 requires for config replay at boot.
    pub fn sensors_in_replay_order(&self) -> Vec<&SensorConfig> {
        self.sensors.values().collect()
    }

    pub fn actuators_in_replay_order(&self) -> Vec<&ActuatorConfig> {
        self.actuators.values().collect()
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            sensor_count: self.sensors.len(),
            actuator_count: self.actuators.len(),
            subzone_count: self.subzones.len(),
            zone_assigned: self.zone_assigned(),
            wifi_provisioned: self.wifi_provisioned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn sensor_cfg(gpio: u8) -> SensorConfig {
        SensorConfig {
            gpio: Some(gpio),
            sensor_type: "ph".to_string(),
            interface: "analog".to_string(),
            i2c_address: None,
            onewire_rom: None,
            sampling_interval_seconds: 5,
            provided_values: vec![],
            active: true,
            raw_mode: true,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    #[test]
    fn load_populates_sensors_keyed_by_gpio() {
        let mut store = MemoryKvStore::new();
        store
            .set("sensors", "34", &serde_json::to_vec(&sensor_cfg(34)).unwrap())
            .unwrap();
        let mut mgr = ConfigManager::new();
        let errors = mgr.load(&store);
        assert!(errors.is_empty());
        assert!(mgr.sensors.contains_key(&34));
    }

    #[test]
    fn load_reports_config_invalid_without_aborting_other_entries() {
        let mut store = MemoryKvStore::new();
        store.set("sensors", "34", b"not json").unwrap();
        store
            .set("sensors", "35", &serde_json::to_vec(&sensor_cfg(35)).unwrap())
            .unwrap();
        let mut mgr = ConfigManager::new();
        let errors = mgr.load(&store);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1, ErrorCode::ConfigInvalid);
        assert!(mgr.sensors.contains_key(&35));
    }

    #[test]
    fn write_through_rolls_back_ram_cache_on_store_failure() {
        let mut store = MemoryKvStore::new();
        let mut mgr = ConfigManager::new();
        mgr.set_sensor(&mut store, 34, sensor_cfg(34)).unwrap();
        store.fail_writes = true;
        let err = mgr.set_sensor(&mut store, 35, sensor_cfg(35)).unwrap_err();
        assert_eq!(err, ErrorCode::NvsWriteFailed);
        assert!(!mgr.sensors.contains_key(&35));
        assert!(mgr.sensors.contains_key(&34));
    }

    #[test]
    fn empty_wifi_namespace_means_not_provisioned() {
        let mgr = ConfigManager::new();
        assert!(!mgr.wifi_provisioned());
        assert!(!mgr.zone_assigned());
    }

    #[test]
    fn replay_order_is_ascending_by_gpio() {
        let mut store = MemoryKvStore::new();
        let mut mgr = ConfigManager::new();
        mgr.set_sensor(&mut store, 35, sensor_cfg(35)).unwrap();
        mgr.set_sensor(&mut store, 5, sensor_cfg(5)).unwrap();
        let order: Vec<u8> = mgr
            .sensors_in_replay_order()
            .iter()
            .filter_map(|c| c.gpio)
            .collect();
        assert_eq!(order, vec![5, 35]);
    }
}
