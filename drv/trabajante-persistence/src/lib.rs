// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Namespaced key-value persistence and the boot-time configuration
//! manager (spec §4.5).

mod config;
mod store;

pub use config::{
    ActuatorConfig, ConfigManager, DiagnosticsSnapshot, MqttConfig, SensorConfig, SubzoneConfig,
    WifiConfig, ZoneConfig, CURRENT_SCHEMA_VERSION,
};
pub use store::{KvStore, MemoryKvStore};
