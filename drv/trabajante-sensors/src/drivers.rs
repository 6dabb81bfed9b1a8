//! Built-in sensor drivers (spec §4.3). Each wraps a small hardware trait
//! so it can be unit tested against a fake; `trabajante-firmware` supplies
//! the real esp-idf-hal-backed implementations of these traits.

use std::collections::BTreeMap;

use trabajante_buses::{I2cBus, I2cTransport, OneWireBus, OneWireTransport};
use trabajante_proto::ErrorCode;

use crate::driver::{Interface, Reading, SensorDriver};

/// Abstracts one ADC channel read, in raw counts.
pub trait AnalogInput {
    fn read_raw(&mut self) -> Result<i32, ErrorCode>;
}

/// Abstracts one digital input pin read.
pub trait DigitalInput {
    fn read_level(&mut self) -> Result<bool, ErrorCode>;
}

pub struct AnalogSensor<A: AnalogInput> {
    sensor_type: String,
    input: A,
}

impl<A: AnalogInput> AnalogSensor<A> {
    pub fn new(sensor_type: impl Into<String>, input: A) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            input,
        }
    }
}

impl<A: AnalogInput> SensorDriver for AnalogSensor<A> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        Ok(())
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        let raw = self.input.read_raw()?;
        Ok(Reading {
            raw: raw as f64,
            secondary: BTreeMap::new(),
        })
    }

    fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    fn interface(&self) -> Interface {
        Interface::Analog
    }
}

pub struct DigitalSensor<D: DigitalInput> {
    sensor_type: String,
    input: D,
}

impl<D: DigitalInput> DigitalSensor<D> {
    pub fn new(sensor_type: impl Into<String>, input: D) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            input,
        }
    }
}

impl<D: DigitalInput> SensorDriver for DigitalSensor<D> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        Ok(())
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        let level = self.input.read_level()?;
        Ok(Reading {
            raw: if level { 1.0 } else { 0.0 },
            secondary: BTreeMap::new(),
        })
    }

    fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    fn interface(&self) -> Interface {
        Interface::Digital
    }
}

/// Single-register raw I2C read: writes `register`, reads back one byte.
/// The fallback driver for any I2C sensor type this firmware doesn't know
/// a richer decode for.
pub struct GenericI2cSensor<T: I2cTransport> {
    sensor_type: String,
    address: u8,
    register: u8,
    bus: I2cBus<T>,
}

impl<T: I2cTransport> GenericI2cSensor<T> {
    pub fn new(sensor_type: impl Into<String>, address: u8, register: u8, bus: I2cBus<T>) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            address,
            register,
            bus,
        }
    }
}

impl<T: I2cTransport> SensorDriver for GenericI2cSensor<T> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.bus.probe(self.address)
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        let mut buf = [0u8; 1];
        self.bus
            .write_read(self.address, &[self.register], &mut buf)?;
        Ok(Reading {
            raw: buf[0] as f64,
            secondary: BTreeMap::new(),
        })
    }

    fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    fn interface(&self) -> Interface {
        Interface::I2c
    }
}

/// Sensirion SHT31: a 6-byte read (temp MSB/LSB/CRC, humidity MSB/LSB/CRC)
/// after issuing a high-repeatability measurement command. Populates
/// `secondary["humidity"]`; `raw` carries the temperature count so a
/// raw-mode payload still has a sensible primary value.
pub struct Sht31Sensor<T: I2cTransport> {
    address: u8,
    bus: I2cBus<T>,
}

impl<T: I2cTransport> Sht31Sensor<T> {
    pub const MEASURE_CMD: [u8; 2] = [0x2C, 0x06];

    pub fn new(address: u8, bus: I2cBus<T>) -> Self {
        Self { address, bus }
    }
}

impl<T: I2cTransport> SensorDriver for Sht31Sensor<T> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.bus.probe(self.address)
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        let mut buf = [0u8; 6];
        self.bus
            .write_read(self.address, &Self::MEASURE_CMD, &mut buf)?;
        let temp_raw = u16::from_be_bytes([buf[0], buf[1]]) as f64;
        let humidity_raw = u16::from_be_bytes([buf[3], buf[4]]) as f64;
        let humidity = humidity_raw * 100.0 / 65535.0;
        let mut secondary = BTreeMap::new();
        secondary.insert("humidity".to_string(), humidity);
        Ok(Reading {
            raw: temp_raw,
            secondary,
        })
    }

    fn sensor_type(&self) -> &str {
        "sht31"
    }

    fn interface(&self) -> Interface {
        Interface::I2c
    }
}

/// Bosch BME280: populates `secondary["humidity"]` and
/// `secondary["pressure"]` alongside a temperature `raw` value. Compensation
/// from raw ADC counts is left to the server, consistent with raw mode.
pub struct Bme280Sensor<T: I2cTransport> {
    address: u8,
    bus: I2cBus<T>,
}

impl<T: I2cTransport> Bme280Sensor<T> {
    const DATA_REGISTER: u8 = 0xF7;

    pub fn new(address: u8, bus: I2cBus<T>) -> Self {
        Self { address, bus }
    }
}

impl<T: I2cTransport> SensorDriver for Bme280Sensor<T> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.bus.probe(self.address)
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        let mut buf = [0u8; 8];
        self.bus
            .write_read(self.address, &[Self::DATA_REGISTER], &mut buf)?;
        let pressure_raw = ((buf[0] as u32) << 12 | (buf[1] as u32) << 4 | (buf[2] as u32) >> 4) as f64;
        let temp_raw = ((buf[3] as u32) << 12 | (buf[4] as u32) << 4 | (buf[5] as u32) >> 4) as f64;
        let humidity_raw = u16::from_be_bytes([buf[6], buf[7]]) as f64;
        let mut secondary = BTreeMap::new();
        secondary.insert("humidity".to_string(), humidity_raw);
        secondary.insert("pressure".to_string(), pressure_raw);
        Ok(Reading {
            raw: temp_raw,
            secondary,
        })
    }

    fn sensor_type(&self) -> &str {
        "bme280"
    }

    fn interface(&self) -> Interface {
        Interface::I2c
    }
}

/// DS18B20-style single-ROM temperature probe over a shared OneWire bus.
pub struct OneWireTempSensor<T: OneWireTransport> {
    rom: [u8; 8],
    bus: OneWireBus<T>,
}

impl<T: OneWireTransport> OneWireTempSensor<T> {
    pub fn new(rom: [u8; 8], bus: OneWireBus<T>) -> Self {
        Self { rom, bus }
    }
}

impl<T: OneWireTransport> SensorDriver for OneWireTempSensor<T> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        let mut scratch = [0u8; 2];
        self.bus.read_device(self.rom, &mut scratch)?;
        Ok(())
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        let mut buf = [0u8; 2];
        self.bus.read_device(self.rom, &mut buf)?;
        let raw = i16::from_le_bytes(buf) as f64;
        Ok(Reading {
            raw,
            secondary: BTreeMap::new(),
        })
    }

    fn sensor_type(&self) -> &str {
        "ds18b20"
    }

    fn interface(&self) -> Interface {
        Interface::OneWire
    }
}

/// Fallback for any `(interface_type, sensor_type)` pair the firmware
/// doesn't recognize (spec §4.3: "unknown types default to
/// raw-passthrough"). Delegates the actual bit-banging to whichever input
/// trait matches the configured interface.
pub enum RawPassthroughSensor<A: AnalogInput, D: DigitalInput> {
    Analog { sensor_type: String, input: A },
    Digital { sensor_type: String, input: D },
}

impl<A: AnalogInput, D: DigitalInput> SensorDriver for RawPassthroughSensor<A, D> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        Ok(())
    }

    fn end(&mut self) {}

    fn read(&mut self) -> Result<Reading, ErrorCode> {
        match self {
            RawPassthroughSensor::Analog { input, .. } => Ok(Reading {
                raw: input.read_raw()? as f64,
                secondary: BTreeMap::new(),
            }),
            RawPassthroughSensor::Digital { input, .. } => Ok(Reading {
                raw: if input.read_level()? { 1.0 } else { 0.0 },
                secondary: BTreeMap::new(),
            }),
        }
    }

    fn sensor_type(&self) -> &str {
        match self {
            RawPassthroughSensor::Analog { sensor_type, .. } => sensor_type,
            RawPassthroughSensor::Digital { sensor_type, .. } => sensor_type,
        }
    }

    fn interface(&self) -> Interface {
        match self {
            RawPassthroughSensor::Analog { .. } => Interface::Analog,
            RawPassthroughSensor::Digital { .. } => Interface::Digital,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeAnalog(i32);
    impl AnalogInput for FakeAnalog {
        fn read_raw(&mut self) -> Result<i32, ErrorCode> {
            Ok(self.0)
        }
    }

    struct FailingAnalog;
    impl AnalogInput for FailingAnalog {
        fn read_raw(&mut self) -> Result<i32, ErrorCode> {
            Err(ErrorCode::SensorReadFailed)
        }
    }

    #[test]
    fn analog_sensor_reports_raw_counts() {
        let mut sensor = AnalogSensor::new("ph", FakeAnalog(2150));
        let reading = sensor.read().unwrap();
        assert_eq!(reading.raw, 2150.0);
        assert!(reading.secondary.is_empty());
    }

    #[test]
    fn analog_sensor_propagates_hardware_errors() {
        let mut sensor = AnalogSensor::new("ph", FailingAnalog);
        assert_eq!(sensor.read().unwrap_err(), ErrorCode::SensorReadFailed);
    }

    struct FakeI2c {
        payload: Vec<u8>,
    }

    impl I2cTransport for FakeI2c {
        fn write_read(
            &mut self,
            _address: u8,
            _out: &[u8],
            in_buf: &mut [u8],
        ) -> Result<(), ErrorCode> {
            in_buf.copy_from_slice(&self.payload[..in_buf.len()]);
            Ok(())
        }
    }

    #[test]
    fn sht31_decodes_temperature_and_humidity() {
        let bus = I2cBus::new(FakeI2c {
            payload: vec![0x64, 0x00, 0x00, 0x80, 0x00, 0x00],
        });
        let mut sensor = Sht31Sensor::new(0x44, bus);
        let reading = sensor.read().unwrap();
        assert_eq!(reading.raw, 0x6400 as f64);
        assert!(reading.secondary.contains_key("humidity"));
    }

    #[test]
    fn bme280_populates_humidity_and_pressure() {
        let bus = I2cBus::new(FakeI2c {
            payload: vec![0, 0, 0, 0, 0, 0, 0, 0],
        });
        let mut sensor = Bme280Sensor::new(0x76, bus);
        let reading = sensor.read().unwrap();
        assert!(reading.secondary.contains_key("humidity"));
        assert!(reading.secondary.contains_key("pressure"));
    }
}
