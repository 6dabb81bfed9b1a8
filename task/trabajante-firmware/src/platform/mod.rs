//! Platform glue: one module per peripheral class, each implementing the
//! corresponding hardware trait from a `drv/*` crate over real
//! `esp-idf-hal`/`esp-idf-svc` types. Nothing outside this module ever
//! names an `esp-idf-*` type directly.

mod factory;
mod gpio;
mod i2c;
mod mqtt;
mod nvs;
mod onewire;
mod pwm;
mod wifi;

pub use factory::EspDeviceFactory;
pub use gpio::{EspAnalogInput, EspDigitalInput, EspPinController};
pub use i2c::EspI2cTransport;
pub use mqtt::{EspMqttTransport, RawInbound};
pub use nvs::NvsKvStore;
pub use onewire::EspOneWireTransport;
pub use pwm::{EspBinaryOutput, EspPwmOutput, PwmChannelBank};
pub use wifi::EspWifiTransport;
