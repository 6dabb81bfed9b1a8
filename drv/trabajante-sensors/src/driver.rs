//! Sensor driver contract (spec §4.3). Every driver, regardless of
//! interface, exposes the same four operations; the manager never knows
//! about ADC channels, I2C registers, or OneWire ROMs directly.

use std::collections::BTreeMap;

use trabajante_proto::ErrorCode;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Interface {
    Analog,
    Digital,
    I2c,
    OneWire,
}

/// A single sample pulled from a driver. `secondary` carries the
/// canonical-name → value map for multi-value devices (SHT31, BME280);
/// empty for single-value drivers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reading {
    pub raw: f64,
    pub secondary: BTreeMap<String, f64>,
}

pub trait SensorDriver {
    fn begin(&mut self) -> Result<(), ErrorCode>;
    fn end(&mut self);
    fn read(&mut self) -> Result<Reading, ErrorCode>;
    fn sensor_type(&self) -> &str;
    fn interface(&self) -> Interface;
}
