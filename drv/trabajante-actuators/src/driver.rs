//! Actuator driver contract (spec §4.4).

use trabajante_proto::ErrorCode;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActuatorKind {
    Binary,
    Pwm,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DriverStatus {
    pub state: &'static str,
    pub value: f64,
}

pub trait ActuatorDriver {
    fn begin(&mut self) -> Result<(), ErrorCode>;
    fn end(&mut self);
    /// `value` is pre-clamped to `[0.0, 1.0]` by the manager; drivers only
    /// need to push it to hardware.
    fn set_value(&mut self, value: f64) -> Result<(), ErrorCode>;
    fn set_binary(&mut self, on: bool) -> Result<(), ErrorCode>;
    /// Forces the safe default output regardless of the last commanded
    /// value; called on every ACTIVE/CLEARING tick.
    fn force_safe_default(&mut self) -> Result<(), ErrorCode>;
    fn status(&self) -> DriverStatus;
    fn kind(&self) -> ActuatorKind;
    fn actuator_type(&self) -> &str;
}
