// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared bus drivers sitting behind the GPIO arbiter (spec §4.2): the I2C
//! controller, the OneWire bus, and the PWM channel pool. Sensor and
//! actuator drivers borrow from these rather than owning a peripheral
//! outright, since several devices can share one physical bus.

mod i2c;
mod onewire;
mod pwm;

pub use i2c::{I2cBus, I2cTransport, MAX_ADDRESS, MIN_ADDRESS, is_valid_address};
pub use onewire::{MISS_BUDGET, OneWireBus, OneWireTransport, crc8, parse_rom_hex, validate_rom};
pub use pwm::{POOL_SIZE, PwmChannel, PwmPool};
