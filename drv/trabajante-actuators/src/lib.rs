// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Actuator registry, driver contract, emergency state machine, and
//! runtime watchdog (spec §4.4).

mod driver;
mod drivers;
mod manager;
mod state;

pub use driver::{ActuatorDriver, ActuatorKind, DriverStatus};
pub use drivers::{
    acquire_pwm_channel, BinaryActuator, BinaryOutput, PumpActuator, PwmActuator, PwmOutput,
    ValveActuator,
};
pub use manager::{
    clamp_pwm_value, ActuatorManager, ActuatorSlot, CommandOutcome, DEFAULT_RESUME_RAMP_TICKS,
};
pub use state::{EmergencyState, Transition};
