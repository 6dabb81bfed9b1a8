//! Board-model policy: the set of facts about a physical ESP32 variant
//! that the arbiter needs in order to validate a pin request. Parameterizing
//! on this trait is what lets one firmware image compile for several ESP32
//! variants (WROOM/WROVER, C3, XIAO) without scattering `#[cfg]` through the
//! arbiter itself.

/// Electrical role a pin is being claimed for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Input,
    Output,
    /// I2C/OneWire bus pins (bidirectional, owned by the bus) and ADC
    /// channel pins: electrical setup is owned by the specific driver
    /// factory, not a generic Input/Output `PinController` mode.
    Bus,
}

pub trait BoardModel: Send + Sync {
    /// Human-readable model name, surfaced in the heartbeat.
    fn name(&self) -> &'static str;

    /// Every GPIO number the board exposes at all.
    fn known_pins(&self) -> &'static [u8];

    /// Pins reserved by the system (flash/PSRAM QSPI, UART0) that must
    /// never be claimed by a sensor or actuator.
    fn system_reserved_pins(&self) -> &'static [u8];

    /// Pins that are input-only at the silicon level (ESP32's GPIO34-39
    /// class) and can therefore never be claimed for `Direction::Output`.
    fn input_only_pins(&self) -> &'static [u8];

    /// The fixed SDA/SCL pair for the shared I2C bus.
    fn i2c_pins(&self) -> (u8, u8);

    /// Default bus pin for the OneWire bus.
    fn onewire_default_pin(&self) -> u8;

    /// Number of hardware PWM/LEDC channels available in the pool.
    fn pwm_channel_count(&self) -> usize;

    fn is_known(&self, gpio: u8) -> bool {
        self.known_pins().contains(&gpio)
    }

    fn is_system_reserved(&self, gpio: u8) -> bool {
        self.system_reserved_pins().contains(&gpio)
    }

    fn is_input_only(&self, gpio: u8) -> bool {
        self.input_only_pins().contains(&gpio)
    }

    /// Whether `gpio` may be claimed for the given `direction` on this board.
    fn allows_direction(&self, gpio: u8, direction: Direction) -> bool {
        if direction == Direction::Output && self.is_input_only(gpio) {
            return false;
        }
        true
    }
}

/// ESP32 WROOM/WROVER (the 38-pin dev-kit form factor): the "full size"
/// variant with 20 usable sensor/actuator slots.
pub struct Esp32Wroom;

impl BoardModel for Esp32Wroom {
    fn name(&self) -> &'static str {
        "esp32-wroom"
    }

    fn known_pins(&self) -> &'static [u8] {
        &[
            0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33, 34,
            35, 36, 39,
        ]
    }

    fn system_reserved_pins(&self) -> &'static [u8] {
        // UART0 (1, 3) and the flash/PSRAM QSPI pins (6-11) are never
        // exposed via `known_pins`, but GPIO0 and GPIO2 carry strapping
        // duties at boot and are treated as system-owned too.
        &[0, 1, 3]
    }

    fn input_only_pins(&self) -> &'static [u8] {
        &[34, 35, 36, 39]
    }

    fn i2c_pins(&self) -> (u8, u8) {
        (21, 22) // SDA, SCL
    }

    fn onewire_default_pin(&self) -> u8 {
        4
    }

    fn pwm_channel_count(&self) -> usize {
        16
    }
}

/// ESP32-C3 (and its XIAO-form-factor variant): a smaller RISC-V part
/// with fewer usable GPIOs and LEDC channels.
pub struct Esp32C3;

impl BoardModel for Esp32C3 {
    fn name(&self) -> &'static str {
        "esp32-c3"
    }

    fn known_pins(&self) -> &'static [u8] {
        &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 18, 19, 20, 21]
    }

    fn system_reserved_pins(&self) -> &'static [u8] {
        &[18, 19, 20, 21] // USB-JTAG / UART0 on most C3 boards
    }

    fn input_only_pins(&self) -> &'static [u8] {
        &[]
    }

    fn i2c_pins(&self) -> (u8, u8) {
        (8, 9)
    }

    fn onewire_default_pin(&self) -> u8 {
        2
    }

    fn pwm_channel_count(&self) -> usize {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wroom_rejects_output_on_input_only_pins() {
        let board = Esp32Wroom;
        assert!(!board.allows_direction(34, Direction::Output));
        assert!(board.allows_direction(34, Direction::Input));
        assert!(board.allows_direction(5, Direction::Output));
    }

    #[test]
    fn c3_has_no_input_only_pins() {
        let board = Esp32C3;
        assert!(board.allows_direction(2, Direction::Output));
    }
}
