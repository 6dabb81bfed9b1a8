//! `BinaryOutput`/`PwmOutput` over real `esp-idf-hal` pins and the LEDC
//! duty-cycle peripheral.

use std::cell::RefCell;
use std::rc::Rc;

use esp_idf_hal::gpio::{AnyIOPin, Output, PinDriver};
use esp_idf_hal::ledc::{
    LedcDriver, LedcTimerDriver, CHANNEL0, CHANNEL1, CHANNEL2, CHANNEL3, CHANNEL4, CHANNEL5,
};
use trabajante_actuators::{BinaryOutput, PwmOutput};
use trabajante_buses::{PwmChannel, POOL_SIZE};
use trabajante_proto::ErrorCode;

pub struct EspBinaryOutput<'d> {
    pin: PinDriver<'d, AnyIOPin, Output>,
}

impl<'d> EspBinaryOutput<'d> {
    pub fn new(pin: PinDriver<'d, AnyIOPin, Output>) -> Self {
        Self { pin }
    }
}

impl<'d> BinaryOutput for EspBinaryOutput<'d> {
    fn set(&mut self, on: bool) -> Result<(), ErrorCode> {
        if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
        .map_err(|_| ErrorCode::ActuatorSetFailed)
    }
}

/// One slot per [`POOL_SIZE`] LEDC channel, shared by every PWM-driven
/// actuator (pump or plain PWM output) currently registered: `PwmPool`
/// hands out the index, this just holds the live driver for whichever
/// index has been built.
pub struct EspPwmOutput<'d> {
    channels: Vec<Option<LedcDriver<'d>>>,
}

impl<'d> EspPwmOutput<'d> {
    pub fn new() -> Self {
        let mut channels = Vec::with_capacity(POOL_SIZE);
        channels.resize_with(POOL_SIZE, || None);
        Self { channels }
    }

    /// Installs a freshly built driver into `channel`'s slot, replacing
    /// whatever was there (there shouldn't be anything: `PwmPool` only
    /// hands out an index once it's free).
    pub fn install(&mut self, channel: PwmChannel, driver: LedcDriver<'d>) {
        if let Some(slot) = self.channels.get_mut(channel.0 as usize) {
            *slot = Some(driver);
        }
    }
}

impl<'d> Default for EspPwmOutput<'d> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'d> PwmOutput for EspPwmOutput<'d> {
    fn set_duty(&mut self, channel: PwmChannel, duty: f64) -> Result<(), ErrorCode> {
        let driver = self
            .channels
            .get_mut(channel.0 as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(ErrorCode::ActuatorSetFailed)?;
        let max_duty = driver.get_max_duty();
        let target = (duty * max_duty as f64).round() as u32;
        driver
            .set_duty(target)
            .map_err(|_| ErrorCode::ActuatorSetFailed)
    }
}

/// Lets every `PwmActuator`/`PumpActuator` share the one
/// `EspPwmOutput` pool, the same way `EspPinController` is shared via
/// `Rc<RefCell<_>>` between the arbiter and the device factory.
impl<'d> PwmOutput for Rc<RefCell<EspPwmOutput<'d>>> {
    fn set_duty(&mut self, channel: PwmChannel, duty: f64) -> Result<(), ErrorCode> {
        self.borrow_mut().set_duty(channel, duty)
    }
}

/// The six ESP32 LEDC channels as distinct `esp-idf-hal` peripheral
/// types. `Peripherals` hands each one out as its own concrete type
/// rather than a homogeneous array, so a channel picked at runtime has
/// to be matched out of this enum before it can be handed to
/// `LedcDriver::new`.
enum RawChannel {
    C0(CHANNEL0),
    C1(CHANNEL1),
    C2(CHANNEL2),
    C3(CHANNEL3),
    C4(CHANNEL4),
    C5(CHANNEL5),
}

/// Singleton bank of the board's LEDC channel peripherals, each "taken"
/// out at most once when a PWM/pump actuator first claims that index.
/// Channels taken out are never given back even if the owning actuator
/// is later removed — matches `PwmPool`'s own index bookkeeping being
/// the only thing that's reusable, not the underlying hardware slot.
pub struct PwmChannelBank {
    slots: [Option<RawChannel>; POOL_SIZE],
    timer: LedcTimerDriver<'static>,
}

impl PwmChannelBank {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timer: LedcTimerDriver<'static>,
        channel0: CHANNEL0,
        channel1: CHANNEL1,
        channel2: CHANNEL2,
        channel3: CHANNEL3,
        channel4: CHANNEL4,
        channel5: CHANNEL5,
    ) -> Self {
        Self {
            slots: [
                Some(RawChannel::C0(channel0)),
                Some(RawChannel::C1(channel1)),
                Some(RawChannel::C2(channel2)),
                Some(RawChannel::C3(channel3)),
                Some(RawChannel::C4(channel4)),
                Some(RawChannel::C5(channel5)),
            ],
            timer,
        }
    }

    /// Builds a `LedcDriver` bound to `pin` on the channel at `index`,
    /// consuming that slot. `index` is expected to come straight from
    /// `PwmPool::acquire`, so an out-of-range or already-taken index is a
    /// logic error upstream rather than something callers retry.
    pub fn build(&mut self, index: u8, pin: AnyIOPin) -> Result<LedcDriver<'static>, ErrorCode> {
        let slot = self
            .slots
            .get_mut(index as usize)
            .ok_or(ErrorCode::PwmChannelFull)?;
        let channel = slot.take().ok_or(ErrorCode::PwmChannelFull)?;
        let built = match channel {
            RawChannel::C0(c) => LedcDriver::new(c, &self.timer, pin),
            RawChannel::C1(c) => LedcDriver::new(c, &self.timer, pin),
            RawChannel::C2(c) => LedcDriver::new(c, &self.timer, pin),
            RawChannel::C3(c) => LedcDriver::new(c, &self.timer, pin),
            RawChannel::C4(c) => LedcDriver::new(c, &self.timer, pin),
            RawChannel::C5(c) => LedcDriver::new(c, &self.timer, pin),
        };
        built.map_err(|_| ErrorCode::GpioInitFailed)
    }
}
