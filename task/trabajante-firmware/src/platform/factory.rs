//! The `esp-idf-hal`-backed [`DeviceFactory`]: turns a persisted
//! sensor/actuator config record into the concrete driver it names,
//! pulling the live pin/ADC/LEDC handle out of whatever the arbiter's
//! reservation already built.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::PinDriver;
use trabajante_actuators::{
    acquire_pwm_channel, ActuatorDriver, BinaryActuator, PumpActuator, PwmActuator, ValveActuator,
};
use trabajante_buses::{parse_rom_hex, validate_rom, I2cBus, OneWireBus, PwmPool};
use trabajante_persistence::{ActuatorConfig, SensorConfig};
use trabajante_proto::ErrorCode;
use trabajante_sensors::{
    AnalogSensor, Bme280Sensor, DigitalSensor, GenericI2cSensor, OneWireTempSensor, SensorDriver,
    Sht31Sensor,
};

use crate::device_factory::DeviceFactory;
use crate::platform::gpio::EspPinController;
use crate::platform::i2c::EspI2cTransport;
use crate::platform::onewire::EspOneWireTransport;
use crate::platform::pwm::{EspBinaryOutput, EspPwmOutput, PwmChannelBank};
use crate::platform::{EspAnalogInput, EspDigitalInput};

pub struct EspDeviceFactory<'d> {
    controller: Rc<RefCell<EspPinController<'d>>>,
    adc: Rc<RefCell<AdcDriver<'d, ADC1>>>,
    i2c: EspI2cTransport<'d>,
    pwm_pool: PwmPool,
    pwm_bank: PwmChannelBank,
    pwm_output: Rc<RefCell<EspPwmOutput<'d>>>,
    onewire: HashMap<u8, Rc<RefCell<EspOneWireTransport<'d>>>>,
}

impl<'d> EspDeviceFactory<'d> {
    pub fn new(
        controller: Rc<RefCell<EspPinController<'d>>>,
        adc: Rc<RefCell<AdcDriver<'d, ADC1>>>,
        i2c: EspI2cTransport<'d>,
        pwm_bank: PwmChannelBank,
    ) -> Self {
        Self {
            controller,
            adc,
            i2c,
            pwm_pool: PwmPool::new(),
            pwm_bank,
            pwm_output: Rc::new(RefCell::new(EspPwmOutput::new())),
            onewire: HashMap::new(),
        }
    }

    fn onewire_transport(&mut self, gpio: u8) -> Result<Rc<RefCell<EspOneWireTransport<'d>>>, ErrorCode> {
        if let Some(existing) = self.onewire.get(&gpio) {
            return Ok(existing.clone());
        }
        let raw = self
            .controller
            .borrow_mut()
            .take_raw_pin(gpio)
            .ok_or(ErrorCode::GpioInvalidMode)?;
        let pin = PinDriver::input_output(raw).map_err(|_| ErrorCode::GpioInitFailed)?;
        let transport = Rc::new(RefCell::new(EspOneWireTransport::new(pin)?));
        self.onewire.insert(gpio, transport.clone());
        Ok(transport)
    }
}

impl<'d> DeviceFactory for EspDeviceFactory<'d> {
    fn build_sensor(&mut self, cfg: &SensorConfig) -> Result<Box<dyn SensorDriver>, ErrorCode> {
        match cfg.interface.as_str() {
            "analog" => {
                let gpio = cfg.gpio.ok_or(ErrorCode::ConfigMissing)?;
                let raw = self
                    .controller
                    .borrow_mut()
                    .take_raw_pin(gpio)
                    .ok_or(ErrorCode::GpioInvalidMode)?;
                let channel =
                    AdcChannelDriver::new(raw).map_err(|_| ErrorCode::GpioInitFailed)?;
                let input = EspAnalogInput::new(self.adc.clone(), channel);
                Ok(Box::new(AnalogSensor::new(cfg.sensor_type.clone(), input)))
            }
            "digital" => {
                let gpio = cfg.gpio.ok_or(ErrorCode::ConfigMissing)?;
                let driver = self
                    .controller
                    .borrow_mut()
                    .take_input_driver(gpio)
                    .ok_or(ErrorCode::GpioInvalidMode)?;
                let input = EspDigitalInput::new(driver);
                Ok(Box::new(DigitalSensor::new(cfg.sensor_type.clone(), input)))
            }
            "onewire" => {
                let gpio = cfg.gpio.ok_or(ErrorCode::ConfigMissing)?;
                let rom_hex = cfg.onewire_rom.as_deref().ok_or(ErrorCode::ConfigMissing)?;
                let rom = parse_rom_hex(rom_hex).ok_or(ErrorCode::OnewireInvalidRomCrc)?;
                validate_rom(rom)?;
                let transport = self.onewire_transport(gpio)?;
                Ok(Box::new(OneWireTempSensor::new(rom, OneWireBus::new(transport))))
            }
            "i2c" => {
                let address = cfg.i2c_address.ok_or(ErrorCode::ConfigMissing)?;
                let mut probe_bus = I2cBus::new(self.i2c.clone());
                probe_bus.probe(address)?;
                let driver: Box<dyn SensorDriver> = match cfg.sensor_type.as_str() {
                    "sht31" => Box::new(Sht31Sensor::new(address, I2cBus::new(self.i2c.clone()))),
                    "bme280" => Box::new(Bme280Sensor::new(address, I2cBus::new(self.i2c.clone()))),
                    _ => Box::new(GenericI2cSensor::new(
                        cfg.sensor_type.clone(),
                        address,
                        0x00,
                        I2cBus::new(self.i2c.clone()),
                    )),
                };
                Ok(driver)
            }
            _ => Err(ErrorCode::ConfigInvalid),
        }
    }

    fn build_actuator(&mut self, cfg: &ActuatorConfig) -> Result<Box<dyn ActuatorDriver>, ErrorCode> {
        match cfg.actuator_type.as_str() {
            "valve" => {
                let driver = self
                    .controller
                    .borrow_mut()
                    .take_output_driver(cfg.gpio)
                    .ok_or(ErrorCode::GpioInvalidMode)?;
                Ok(Box::new(ValveActuator::new(EspBinaryOutput::new(driver), cfg.inverted)))
            }
            "pump" | "pwm" => {
                let raw = self
                    .controller
                    .borrow_mut()
                    .take_raw_pin(cfg.gpio)
                    .ok_or(ErrorCode::GpioInvalidMode)?;
                let channel = acquire_pwm_channel(&mut self.pwm_pool)?;
                let driver = self.pwm_bank.build(channel.0, raw)?;
                self.pwm_output.borrow_mut().install(channel, driver);
                if cfg.actuator_type == "pump" {
                    Ok(Box::new(PumpActuator::new(self.pwm_output.clone(), channel)))
                } else {
                    Ok(Box::new(PwmActuator::new(
                        cfg.actuator_type.clone(),
                        self.pwm_output.clone(),
                        channel,
                    )))
                }
            }
            _ => {
                let driver = self
                    .controller
                    .borrow_mut()
                    .take_output_driver(cfg.gpio)
                    .ok_or(ErrorCode::GpioInvalidMode)?;
                Ok(Box::new(BinaryActuator::new(
                    cfg.actuator_type.clone(),
                    EspBinaryOutput::new(driver),
                    cfg.inverted,
                )))
            }
        }
    }
}
