//! `PinController` over real `esp-idf-hal` GPIOs. Every pin the board
//! exposes is erased to `AnyIOPin` at boot and handed to this controller;
//! reconfiguring a pin means dropping whatever driver currently owns it
//! and building a fresh one in the requested mode, mirroring the
//! arbiter's own claim/release lifecycle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::gpio::{AnyIOPin, Input, Output, Pull};
use trabajante_gpio::PinController;
use trabajante_proto::ErrorCode;
use trabajante_sensors::{AnalogInput, DigitalInput};

enum PinMode<'d> {
    Safe,
    Input(esp_idf_hal::gpio::PinDriver<'d, AnyIOPin, Input>),
    Output(esp_idf_hal::gpio::PinDriver<'d, AnyIOPin, Output>),
}

/// Owns every GPIO the board exposes, either parked idle (not currently
/// driven by any mode-specific driver) or wrapped in an active
/// `PinDriver`. `raw` holds pins not currently claimed by either driver
/// variant so they can be (re)built on demand.
pub struct EspPinController<'d> {
    raw: HashMap<u8, AnyIOPin>,
    modes: HashMap<u8, PinMode<'d>>,
}

impl<'d> EspPinController<'d> {
    pub fn new(pins: Vec<(u8, AnyIOPin)>) -> Self {
        Self {
            raw: pins.into_iter().collect(),
            modes: HashMap::new(),
        }
    }

    fn reclaim_raw(&mut self, gpio: u8) -> Result<AnyIOPin, ErrorCode> {
        if let Some(pin) = self.raw.remove(&gpio) {
            return Ok(pin);
        }
        match self.modes.remove(&gpio) {
            Some(PinMode::Input(driver)) => driver.release().map_err(|_| ErrorCode::GpioInitFailed),
            Some(PinMode::Output(driver)) => driver.release().map_err(|_| ErrorCode::GpioInitFailed),
            _ => Err(ErrorCode::GpioInvalidMode),
        }
    }

    /// Pulls the `Input`-mode driver a prior `set_input` call built for
    /// `gpio` out of `modes`, for a device factory to wrap into a concrete
    /// sensor driver (`EspDigitalInput`). `None` if the pin isn't currently
    /// reserved in input mode; the caller is expected to have just
    /// requested it via the arbiter, so this should only miss on a logic
    /// error upstream.
    pub fn take_input_driver(&mut self, gpio: u8) -> Option<esp_idf_hal::gpio::PinDriver<'d, AnyIOPin, Input>> {
        match self.modes.remove(&gpio)? {
            PinMode::Input(driver) => Some(driver),
            other => {
                self.modes.insert(gpio, other);
                None
            }
        }
    }

    /// Same as [`Self::take_input_driver`] but for `Output` mode, used to
    /// build `EspBinaryOutput`/PWM pin handles.
    pub fn take_output_driver(&mut self, gpio: u8) -> Option<esp_idf_hal::gpio::PinDriver<'d, AnyIOPin, Output>> {
        match self.modes.remove(&gpio)? {
            PinMode::Output(driver) => Some(driver),
            other => {
                self.modes.insert(gpio, other);
                None
            }
        }
    }

    /// Pulls an unclaimed pin straight out of the raw pool, for interfaces
    /// the arbiter reserves under `Direction::Bus` (OneWire, analog):
    /// their electrical mode isn't a plain `PinDriver<Input>`/`<Output>`,
    /// so `request_pin` never touches `modes` for them and the pin is
    /// still sitting in `raw`.
    pub fn take_raw_pin(&mut self, gpio: u8) -> Option<AnyIOPin> {
        self.raw.remove(&gpio)
    }
}

impl<'d> PinController for EspPinController<'d> {
    fn set_safe_mode(&mut self, gpio: u8) -> Result<(), ErrorCode> {
        let pin = self.reclaim_raw(gpio)?;
        let mut driver = esp_idf_hal::gpio::PinDriver::input(pin)
            .map_err(|_| ErrorCode::GpioInitFailed)?;
        driver
            .set_pull(Pull::Up)
            .map_err(|_| ErrorCode::GpioInitFailed)?;
        self.modes.insert(gpio, PinMode::Input(driver));
        Ok(())
    }

    fn set_output(&mut self, gpio: u8) -> Result<(), ErrorCode> {
        let pin = self.reclaim_raw(gpio)?;
        let driver =
            esp_idf_hal::gpio::PinDriver::output(pin).map_err(|_| ErrorCode::GpioInitFailed)?;
        self.modes.insert(gpio, PinMode::Output(driver));
        Ok(())
    }

    fn set_input(&mut self, gpio: u8, pull_up: bool) -> Result<(), ErrorCode> {
        let pin = self.reclaim_raw(gpio)?;
        let mut driver =
            esp_idf_hal::gpio::PinDriver::input(pin).map_err(|_| ErrorCode::GpioInitFailed)?;
        driver
            .set_pull(if pull_up { Pull::Up } else { Pull::Floating })
            .map_err(|_| ErrorCode::GpioInitFailed)?;
        self.modes.insert(gpio, PinMode::Input(driver));
        Ok(())
    }
}

/// One ADC1 oneshot channel bound to a specific pin. Unlike the digital
/// pins above, `esp-idf-hal`'s `ADCPin` trait is implemented per concrete
/// GPIO type rather than for the erased `AnyIOPin`, so analog-capable
/// pins are claimed directly from `Peripherals` at boot by `main.rs`.
/// `ADC1` itself is shared behind an `Rc<RefCell<_>>>` — mirroring
/// `EspI2cTransport`'s shared bus — since every analog sensor's device
/// factory call needs the same one peripheral to build its channel.
pub struct EspAnalogInput<'d> {
    adc: Rc<RefCell<AdcDriver<'d, ADC1>>>,
    channel: AdcChannelDriver<'d, AnyIOPin, ADC1>,
}

impl<'d> EspAnalogInput<'d> {
    pub fn new(
        adc: Rc<RefCell<AdcDriver<'d, ADC1>>>,
        channel: AdcChannelDriver<'d, AnyIOPin, ADC1>,
    ) -> Self {
        Self { adc, channel }
    }
}

impl<'d> AnalogInput for EspAnalogInput<'d> {
    fn read_raw(&mut self) -> Result<i32, ErrorCode> {
        self.adc
            .borrow_mut()
            .read(&mut self.channel)
            .map(|mv| mv as i32)
            .map_err(|_| ErrorCode::SensorReadFailed)
    }
}

/// A digital sensor input reusing the same `PinDriver<AnyIOPin, Input>`
/// shape the arbiter hands out for ordinary input pins.
pub struct EspDigitalInput<'d> {
    pin: esp_idf_hal::gpio::PinDriver<'d, AnyIOPin, Input>,
}

impl<'d> EspDigitalInput<'d> {
    pub fn new(pin: esp_idf_hal::gpio::PinDriver<'d, AnyIOPin, Input>) -> Self {
        Self { pin }
    }
}

impl<'d> DigitalInput for EspDigitalInput<'d> {
    fn read_level(&mut self) -> Result<bool, ErrorCode> {
        Ok(self.pin.is_high())
    }
}
