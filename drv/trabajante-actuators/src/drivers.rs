//! Built-in actuator drivers (spec §4.4). Each wraps a small hardware
//! trait so logic is testable without real silicon; `trabajante-firmware`
//! supplies the esp-idf-hal-backed implementations.

use trabajante_buses::{PwmChannel, PwmPool};
use trabajante_proto::ErrorCode;

use crate::driver::{ActuatorDriver, ActuatorKind, DriverStatus};

pub trait BinaryOutput {
    fn set(&mut self, on: bool) -> Result<(), ErrorCode>;
}

pub trait PwmOutput {
    fn set_duty(&mut self, channel: PwmChannel, duty: f64) -> Result<(), ErrorCode>;
}

/// A simple on/off actuator (relay, solenoid). `inverted` flips the
/// electrical sense only — the logical on/off reported in status is
/// unaffected, per spec.md §4.4's "inverted-flag flips the electrical
/// sense, not the logical sense."
pub struct BinaryActuator<O: BinaryOutput> {
    actuator_type: String,
    output: O,
    inverted: bool,
    is_on: bool,
}

impl<O: BinaryOutput> BinaryActuator<O> {
    pub fn new(actuator_type: impl Into<String>, output: O, inverted: bool) -> Self {
        Self {
            actuator_type: actuator_type.into(),
            output,
            inverted,
            is_on: false,
        }
    }

    fn electrical_level(&self, logical_on: bool) -> bool {
        logical_on ^ self.inverted
    }
}

impl<O: BinaryOutput> ActuatorDriver for BinaryActuator<O> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.force_safe_default()
    }

    fn end(&mut self) {}

    fn set_value(&mut self, value: f64) -> Result<(), ErrorCode> {
        self.set_binary(value > 0.0)
    }

    fn set_binary(&mut self, on: bool) -> Result<(), ErrorCode> {
        let level = self.electrical_level(on);
        self.output.set(level)?;
        self.is_on = on;
        Ok(())
    }

    fn force_safe_default(&mut self) -> Result<(), ErrorCode> {
        let level = self.electrical_level(false);
        self.output.set(level)?;
        self.is_on = false;
        Ok(())
    }

    fn status(&self) -> DriverStatus {
        DriverStatus {
            state: if self.is_on { "on" } else { "off" },
            value: if self.is_on { 1.0 } else { 0.0 },
        }
    }

    fn kind(&self) -> ActuatorKind {
        ActuatorKind::Binary
    }

    fn actuator_type(&self) -> &str {
        &self.actuator_type
    }
}

/// A duty-cycle actuator (dimmer, fan, variable valve) borrowing one
/// channel from the shared PWM pool.
pub struct PwmActuator<O: PwmOutput> {
    actuator_type: String,
    output: O,
    channel: PwmChannel,
    duty: f64,
}

impl<O: PwmOutput> PwmActuator<O> {
    pub fn new(actuator_type: impl Into<String>, output: O, channel: PwmChannel) -> Self {
        Self {
            actuator_type: actuator_type.into(),
            output,
            channel,
            duty: 0.0,
        }
    }
}

impl<O: PwmOutput> ActuatorDriver for PwmActuator<O> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.force_safe_default()
    }

    fn end(&mut self) {}

    fn set_value(&mut self, value: f64) -> Result<(), ErrorCode> {
        self.output.set_duty(self.channel, value)?;
        self.duty = value;
        Ok(())
    }

    fn set_binary(&mut self, on: bool) -> Result<(), ErrorCode> {
        self.set_value(if on { 1.0 } else { 0.0 })
    }

    fn force_safe_default(&mut self) -> Result<(), ErrorCode> {
        self.output.set_duty(self.channel, 0.0)?;
        self.duty = 0.0;
        Ok(())
    }

    fn status(&self) -> DriverStatus {
        DriverStatus {
            state: if self.duty > 0.0 { "on" } else { "off" },
            value: self.duty,
        }
    }

    fn kind(&self) -> ActuatorKind {
        ActuatorKind::Pwm
    }

    fn actuator_type(&self) -> &str {
        &self.actuator_type
    }
}

/// A valve: binary open/close with an implied safe default of closed.
pub struct ValveActuator<O: BinaryOutput> {
    inner: BinaryActuator<O>,
}

impl<O: BinaryOutput> ValveActuator<O> {
    pub fn new(output: O, inverted: bool) -> Self {
        Self {
            inner: BinaryActuator::new("valve", output, inverted),
        }
    }
}

impl<O: BinaryOutput> ActuatorDriver for ValveActuator<O> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.inner.begin()
    }
    fn end(&mut self) {
        self.inner.end()
    }
    fn set_value(&mut self, value: f64) -> Result<(), ErrorCode> {
        self.inner.set_value(value)
    }
    fn set_binary(&mut self, on: bool) -> Result<(), ErrorCode> {
        self.inner.set_binary(on)
    }
    fn force_safe_default(&mut self) -> Result<(), ErrorCode> {
        self.inner.force_safe_default()
    }
    fn status(&self) -> DriverStatus {
        let s = self.inner.status();
        DriverStatus {
            state: if s.state == "on" { "open" } else { "closed" },
            value: s.value,
        }
    }
    fn kind(&self) -> ActuatorKind {
        ActuatorKind::Binary
    }
    fn actuator_type(&self) -> &str {
        "valve"
    }
}

/// A pump: PWM-driven, expected to always carry a `max_runtime_seconds`
/// cap in its configuration (the manager enforces the cap; this driver
/// just drives duty cycle).
pub struct PumpActuator<O: PwmOutput> {
    inner: PwmActuator<O>,
}

impl<O: PwmOutput> PumpActuator<O> {
    pub fn new(output: O, channel: PwmChannel) -> Self {
        Self {
            inner: PwmActuator::new("pump", output, channel),
        }
    }
}

impl<O: PwmOutput> ActuatorDriver for PumpActuator<O> {
    fn begin(&mut self) -> Result<(), ErrorCode> {
        self.inner.begin()
    }
    fn end(&mut self) {
        self.inner.end()
    }
    fn set_value(&mut self, value: f64) -> Result<(), ErrorCode> {
        self.inner.set_value(value)
    }
    fn set_binary(&mut self, on: bool) -> Result<(), ErrorCode> {
        self.inner.set_binary(on)
    }
    fn force_safe_default(&mut self) -> Result<(), ErrorCode> {
        self.inner.force_safe_default()
    }
    fn status(&self) -> DriverStatus {
        self.inner.status()
    }
    fn kind(&self) -> ActuatorKind {
        ActuatorKind::Pwm
    }
    fn actuator_type(&self) -> &str {
        "pump"
    }
}

pub fn acquire_pwm_channel(pool: &mut PwmPool) -> Result<PwmChannel, ErrorCode> {
    pool.acquire()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBinary {
        level: bool,
    }
    impl BinaryOutput for FakeBinary {
        fn set(&mut self, on: bool) -> Result<(), ErrorCode> {
            self.level = on;
            Ok(())
        }
    }

    struct FakePwm {
        duty: f64,
    }
    impl PwmOutput for FakePwm {
        fn set_duty(&mut self, _channel: PwmChannel, duty: f64) -> Result<(), ErrorCode> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn inverted_binary_flips_electrical_level_not_logical_state() {
        let mut act = BinaryActuator::new("relay", FakeBinary { level: false }, true);
        act.set_binary(true).unwrap();
        assert_eq!(act.status().state, "on");
        assert!(!act.output.level); // electrically inverted: logical on -> level low
    }

    #[test]
    fn force_safe_default_turns_binary_actuator_off() {
        let mut act = BinaryActuator::new("relay", FakeBinary { level: false }, false);
        act.set_binary(true).unwrap();
        act.force_safe_default().unwrap();
        assert_eq!(act.status().value, 0.0);
    }

    #[test]
    fn valve_status_uses_open_closed_vocabulary() {
        let mut valve = ValveActuator::new(FakeBinary { level: false }, false);
        valve.set_binary(true).unwrap();
        assert_eq!(valve.status().state, "open");
        valve.force_safe_default().unwrap();
        assert_eq!(valve.status().state, "closed");
    }

    #[test]
    fn pwm_actuator_tracks_commanded_duty() {
        let mut act = PwmActuator::new("dimmer", FakePwm { duty: 0.0 }, PwmChannel(0));
        act.set_value(0.75).unwrap();
        assert_eq!(act.status().value, 0.75);
    }

    #[test]
    fn pump_safe_default_is_zero_duty() {
        let mut pump = PumpActuator::new(FakePwm { duty: 0.9 }, PwmChannel(1));
        pump.set_value(0.9).unwrap();
        pump.force_safe_default().unwrap();
        assert_eq!(pump.status().value, 0.0);
    }
}
