// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sensor registry, driver contract, built-in drivers, and tick-based
//! scheduling (spec §4.3).

mod driver;
mod drivers;
mod manager;

pub use driver::{Interface, Reading, SensorDriver};
pub use drivers::{
    AnalogInput, AnalogSensor, Bme280Sensor, DigitalInput, DigitalSensor, GenericI2cSensor,
    OneWireTempSensor, RawPassthroughSensor, Sht31Sensor,
};
pub use manager::{
    SensorManager, SensorSlot, DEFAULT_DEGRADE_THRESHOLD, DEGRADED_PERIOD_MULTIPLIER, driver_kind,
};
