//! Shared I2C bus. There is exactly one controller at a fixed SDA/SCL pin
//! pair per board; every device sharing it is serialized by the
//! cooperative loop, so this type takes `&mut self` for every transaction
//! and never attempts concurrent access.

use trabajante_proto::ErrorCode;

/// Abstracts the actual bus transaction so the validation/probing logic
/// here is testable without real silicon. Mirrors `embedded-hal`'s I2C
/// trait shape.
pub trait I2cTransport {
    fn write_read(
        &mut self,
        address: u8,
        out: &[u8],
        in_buf: &mut [u8],
    ) -> Result<(), ErrorCode>;
}

/// Lowest and highest valid 7-bit I2C addresses once the reserved ranges
/// (general call, CBUS, high-speed mode, 10-bit addressing) are excluded.
pub const MIN_ADDRESS: u8 = 0x08;
pub const MAX_ADDRESS: u8 = 0x77;

pub fn is_valid_address(address: u8) -> bool {
    (MIN_ADDRESS..=MAX_ADDRESS).contains(&address)
}

pub struct I2cBus<T: I2cTransport> {
    transport: T,
}

impl<T: I2cTransport> I2cBus<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Probes for a device's presence at driver init time by attempting a
    /// zero-length read. `I2cDeviceNotFound` on no ack, `I2cBusError` if the
    /// bus itself appears stuck.
    pub fn probe(&mut self, address: u8) -> Result<(), ErrorCode> {
        if !is_valid_address(address) {
            return Err(ErrorCode::I2cDeviceNotFound);
        }
        let mut scratch = [0u8; 1];
        self.transport.write_read(address, &[], &mut scratch)
    }

    pub fn write_read(
        &mut self,
        address: u8,
        out: &[u8],
        in_buf: &mut [u8],
    ) -> Result<(), ErrorCode> {
        if !is_valid_address(address) {
            return Err(ErrorCode::I2cDeviceNotFound);
        }
        self.transport.write_read(address, out, in_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTransport {
        present: Vec<u8>,
        bus_stuck: bool,
    }

    impl I2cTransport for FakeTransport {
        fn write_read(
            &mut self,
            address: u8,
            _out: &[u8],
            _in_buf: &mut [u8],
        ) -> Result<(), ErrorCode> {
            if self.bus_stuck {
                return Err(ErrorCode::I2cBusError);
            }
            if self.present.contains(&address) {
                Ok(())
            } else {
                Err(ErrorCode::I2cDeviceNotFound)
            }
        }
    }

    #[test]
    fn rejects_addresses_outside_the_7_bit_non_reserved_range() {
        assert!(!is_valid_address(0x00));
        assert!(!is_valid_address(0xff));
        assert!(!is_valid_address(0x07));
        assert!(!is_valid_address(0x78));
        assert!(is_valid_address(0x08));
        assert!(is_valid_address(0x77));
    }

    #[test]
    fn probe_reports_missing_device() {
        let mut bus = I2cBus::new(FakeTransport {
            present: vec![0x44],
            bus_stuck: false,
        });
        assert!(bus.probe(0x44).is_ok());
        assert_eq!(bus.probe(0x45), Err(ErrorCode::I2cDeviceNotFound));
    }

    #[test]
    fn stuck_bus_surfaces_as_bus_error() {
        let mut bus = I2cBus::new(FakeTransport {
            present: vec![0x44],
            bus_stuck: true,
        });
        assert_eq!(bus.probe(0x44), Err(ErrorCode::I2cBusError));
    }
}
