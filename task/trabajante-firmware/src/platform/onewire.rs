//! `OneWireTransport` bit-banged over a single open-drain GPIO, using
//! `esp_idf_hal::delay::Ets` for the microsecond-scale reset/presence
//! timing the 1-Wire protocol requires.

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, InputOutput, PinDriver, Pull};
use trabajante_buses::OneWireTransport;
use trabajante_proto::ErrorCode;

const RESET_LOW_US: u32 = 480;
const PRESENCE_WAIT_US: u32 = 70;
const PRESENCE_SAMPLE_US: u32 = 410;

pub struct EspOneWireTransport<'d> {
    pin: PinDriver<'d, AnyIOPin, InputOutput>,
}

impl<'d> EspOneWireTransport<'d> {
    pub fn new(mut pin: PinDriver<'d, AnyIOPin, InputOutput>) -> Result<Self, ErrorCode> {
        pin.set_pull(Pull::Up).map_err(|_| ErrorCode::GpioInitFailed)?;
        Ok(Self { pin })
    }
}

impl<'d> OneWireTransport for EspOneWireTransport<'d> {
    fn reset(&mut self) -> Result<bool, ErrorCode> {
        self.pin.set_low().map_err(|_| ErrorCode::OnewireDeviceNotFound)?;
        Ets::delay_us(RESET_LOW_US);
        self.pin.set_high().map_err(|_| ErrorCode::OnewireDeviceNotFound)?;
        Ets::delay_us(PRESENCE_WAIT_US);
        let present = !self.pin.is_high();
        Ets::delay_us(PRESENCE_SAMPLE_US);
        Ok(present)
    }

    fn read(&mut self, _rom: [u8; 8], out: &mut [u8]) -> Result<(), ErrorCode> {
        for byte in out.iter_mut() {
            *byte = self.read_byte()?;
        }
        Ok(())
    }
}

impl<'d> EspOneWireTransport<'d> {
    fn read_bit(&mut self) -> Result<bool, ErrorCode> {
        self.pin.set_low().map_err(|_| ErrorCode::OnewireDeviceNotFound)?;
        Ets::delay_us(2);
        self.pin.set_high().map_err(|_| ErrorCode::OnewireDeviceNotFound)?;
        Ets::delay_us(10);
        let bit = self.pin.is_high();
        Ets::delay_us(50);
        Ok(bit)
    }

    fn read_byte(&mut self) -> Result<u8, ErrorCode> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }
}
