//! `I2cTransport` over `esp-idf-hal`'s blocking I2C driver. There is one
//! controller per board, shared by every configured I2C sensor, so the
//! driver is kept behind a cheap `Rc<RefCell<_>>` handle rather than
//! owned outright by any single `I2cBus<EspI2cTransport>`.

use std::cell::RefCell;
use std::rc::Rc;

use esp_idf_hal::i2c::I2cDriver;
use trabajante_buses::I2cTransport;
use trabajante_proto::ErrorCode;

const TIMEOUT_MS: u32 = 500;

#[derive(Clone)]
pub struct EspI2cTransport<'d> {
    driver: Rc<RefCell<I2cDriver<'d>>>,
}

impl<'d> EspI2cTransport<'d> {
    pub fn new(driver: I2cDriver<'d>) -> Self {
        Self {
            driver: Rc::new(RefCell::new(driver)),
        }
    }
}

impl<'d> I2cTransport for EspI2cTransport<'d> {
    fn write_read(
        &mut self,
        address: u8,
        out: &[u8],
        in_buf: &mut [u8],
    ) -> Result<(), ErrorCode> {
        self.driver
            .borrow_mut()
            .write_read(address, out, in_buf, TIMEOUT_MS)
            .map_err(|err| {
                if err.code() == esp_idf_sys::ESP_ERR_TIMEOUT {
                    ErrorCode::I2cBusError
                } else {
                    ErrorCode::I2cDeviceNotFound
                }
            })
    }
}
