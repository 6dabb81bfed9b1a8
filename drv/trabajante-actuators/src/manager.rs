//! Actuator registry, command flow, runtime watchdog, and the priority
//! broadcast-emergency path (spec §4.4).

use log::warn;
use trabajante_proto::payload::{ActuatorAlert, ActuatorResponse, ActuatorStatus};
use trabajante_proto::ErrorCode;

use crate::driver::ActuatorDriver;
use crate::state::{EmergencyState, Transition};

/// Ramp steps consumed while RESUMING before the manager drives the state
/// back to NORMAL. The resolved Open Question (DESIGN.md) picks a
/// zero-duration ramp as the default, i.e. exactly one tick.
pub const DEFAULT_RESUME_RAMP_TICKS: u32 = 1;

pub struct ActuatorSlot {
    pub gpio: u8,
    pub max_runtime_seconds: u64,
    pub driver: Box<dyn ActuatorDriver>,
    state: EmergencyState,
    last_target: f64,
    runtime_active_since: Option<u64>,
    resume_ticks_remaining: u32,
}

pub struct ActuatorManager {
    capacity: usize,
    slots: Vec<ActuatorSlot>,
}

pub struct CommandOutcome {
    pub response: ActuatorResponse,
    pub status: Option<ActuatorStatus>,
    pub alert: Option<ActuatorAlert>,
}

impl ActuatorManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn register(
        &mut self,
        gpio: u8,
        max_runtime_seconds: u64,
        mut driver: Box<dyn ActuatorDriver>,
    ) -> Result<(), ErrorCode> {
        if self.slots.len() >= self.capacity {
            return Err(ErrorCode::ActuatorLimitExceeded);
        }
        if let Err(err) = driver.begin() {
            // A driver that fails to initialize is removed from the
            // registry entirely; nothing is added, and the caller is
            // responsible for releasing the GPIO reservation.
            return Err(err);
        }
        self.slots.push(ActuatorSlot {
            gpio,
            max_runtime_seconds,
            driver,
            state: EmergencyState::Normal,
            last_target: 0.0,
            runtime_active_since: None,
            resume_ticks_remaining: 0,
        });
        Ok(())
    }

    fn slot_mut(&mut self, gpio: u8) -> Option<&mut ActuatorSlot> {
        self.slots.iter_mut().find(|s| s.gpio == gpio)
    }

    /// The priority path for `kaiser/broadcast/emergency`: every actuator
    /// is driven ACTIVE and forced to its safe default immediately, ahead
    /// of any per-GPIO command still queued for this tick.
    pub fn handle_broadcast_emergency(&mut self, now: u64) -> Vec<ActuatorAlert> {
        let mut alerts = Vec::new();
        for slot in self.slots.iter_mut() {
            slot.state = slot.state.apply(Transition::EmergencyStop);
            let _ = slot.driver.force_safe_default();
            slot.runtime_active_since = None;
            alerts.push(ActuatorAlert {
                reason: "broadcast_emergency".to_string(),
                ts: now,
            });
        }
        alerts
    }

    /// Applies a parsed, validated command (value already clamped to
    /// `[0,1]` for PWM kinds by the caller) and reports the result.
    pub fn apply_value(&mut self, gpio: u8, value: f64, now: u64) -> Option<CommandOutcome> {
        let slot = self.slot_mut(gpio)?;
        if !slot.state.accepts_commands() {
            return Some(CommandOutcome {
                response: ActuatorResponse {
                    command: "set_value".to_string(),
                    success: false,
                    error_code: None,
                    ts: now,
                },
                status: None,
                alert: None,
            });
        }
        let result = slot.driver.set_value(value);
        let success = result.is_ok();
        if success {
            slot.last_target = value;
            if value > 0.0 {
                slot.runtime_active_since.get_or_insert(now);
            } else {
                slot.runtime_active_since = None;
            }
        }
        Some(CommandOutcome {
            response: ActuatorResponse {
                command: "set_value".to_string(),
                success,
                error_code: result.err().map(|e| e.code()),
                ts: now,
            },
            status: Some(ActuatorStatus {
                state: slot.driver.status().state.to_string(),
                value: slot.driver.status().value,
                ts: now,
            }),
            alert: None,
        })
    }

    pub fn apply_binary(&mut self, gpio: u8, on: bool, now: u64) -> Option<CommandOutcome> {
        self.apply_value(gpio, if on { 1.0 } else { 0.0 }, now)
    }

    /// Local/server-issued "clear" command, only meaningful from ACTIVE.
    pub fn clear_emergency(&mut self, gpio: u8) -> bool {
        if let Some(slot) = self.slot_mut(gpio) {
            if slot.state == EmergencyState::Active {
                slot.state = slot.state.apply(Transition::ClearCommand);
                slot.resume_ticks_remaining = 0;
                return true;
            }
        }
        false
    }

    /// Advances per-tick state: drives ACTIVE/CLEARING actuators to their
    /// safe default, progresses the CLEARING→RESUMING→NORMAL ramp, and
    /// enforces the runtime watchdog. Returns any alerts raised this tick.
    pub fn tick(&mut self, now: u64) -> Vec<(u8, ActuatorAlert)> {
        let mut alerts = Vec::new();
        for slot in self.slots.iter_mut() {
            if slot.state.forces_safe_default() {
                let _ = slot.driver.force_safe_default();
            }

            match slot.state {
                EmergencyState::Clearing => {
                    slot.state = slot.state.apply(Transition::RampComplete);
                    slot.resume_ticks_remaining = DEFAULT_RESUME_RAMP_TICKS;
                }
                EmergencyState::Resuming => {
                    if slot.resume_ticks_remaining <= 1 {
                        slot.state = slot.state.apply(Transition::ResumeComplete);
                    } else {
                        slot.resume_ticks_remaining -= 1;
                    }
                }
                _ => {}
            }

            if slot.max_runtime_seconds > 0 {
                if let Some(since) = slot.runtime_active_since {
                    if now.saturating_sub(since) > slot.max_runtime_seconds {
                        let _ = slot.driver.force_safe_default();
                        slot.state = slot.state.apply(Transition::EmergencyStop);
                        slot.runtime_active_since = None;
                        warn!("actuator gpio={}: runtime exceeded, forced ACTIVE", slot.gpio);
                        alerts.push((
                            slot.gpio,
                            ActuatorAlert {
                                reason: "RUNTIME_EXCEEDED".to_string(),
                                ts: now,
                            },
                        ));
                    }
                }
            }
        }
        alerts
    }

    pub fn status_of(&self, gpio: u8) -> Option<ActuatorStatus> {
        self.slots.iter().find(|s| s.gpio == gpio).map(|s| {
            let status = s.driver.status();
            ActuatorStatus {
                state: status.state.to_string(),
                value: status.value,
                ts: 0,
            }
        })
    }
}

/// Clamps a PWM command value into `[0.0, 1.0]` per spec.md §4.4's
/// "out-of-range is clamped and a warning is raised." NaN/infinite input
/// is a different case entirely — spec.md §8 requires it rejected with
/// `COMMAND_INVALID` rather than silently substituted, so it returns
/// `None` instead of a clamped value.
pub fn clamp_pwm_value(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ActuatorKind, DriverStatus};

    struct FakeDriver {
        value: f64,
        fail_next: bool,
    }

    impl ActuatorDriver for FakeDriver {
        fn begin(&mut self) -> Result<(), ErrorCode> {
            Ok(())
        }
        fn end(&mut self) {}
        fn set_value(&mut self, value: f64) -> Result<(), ErrorCode> {
            if self.fail_next {
                self.fail_next = false;
                return Err(ErrorCode::ActuatorSetFailed);
            }
            self.value = value;
            Ok(())
        }
        fn set_binary(&mut self, on: bool) -> Result<(), ErrorCode> {
            self.set_value(if on { 1.0 } else { 0.0 })
        }
        fn force_safe_default(&mut self) -> Result<(), ErrorCode> {
            self.value = 0.0;
            Ok(())
        }
        fn status(&self) -> DriverStatus {
            DriverStatus {
                state: if self.value > 0.0 { "on" } else { "off" },
                value: self.value,
            }
        }
        fn kind(&self) -> ActuatorKind {
            ActuatorKind::Pwm
        }
        fn actuator_type(&self) -> &str {
            "pump"
        }
    }

    fn manager_with_one(max_runtime: u64) -> ActuatorManager {
        let mut mgr = ActuatorManager::new(4);
        mgr.register(
            5,
            max_runtime,
            Box::new(FakeDriver {
                value: 0.0,
                fail_next: false,
            }),
        )
        .unwrap();
        mgr
    }

    #[test]
    fn registering_past_capacity_is_rejected() {
        let mut mgr = ActuatorManager::new(1);
        mgr.register(1, 0, Box::new(FakeDriver { value: 0.0, fail_next: false }))
            .unwrap();
        let err = mgr
            .register(2, 0, Box::new(FakeDriver { value: 0.0, fail_next: false }))
            .unwrap_err();
        assert_eq!(err, ErrorCode::ActuatorLimitExceeded);
    }

    #[test]
    fn commands_are_rejected_while_active() {
        let mut mgr = manager_with_one(0);
        mgr.handle_broadcast_emergency(100);
        let outcome = mgr.apply_value(5, 0.5, 101).unwrap();
        assert!(!outcome.response.success);
    }

    #[test]
    fn broadcast_emergency_forces_every_actuator_to_safe_default() {
        let mut mgr = manager_with_one(0);
        mgr.apply_value(5, 0.8, 0).unwrap();
        mgr.handle_broadcast_emergency(1);
        assert_eq!(mgr.status_of(5).unwrap().value, 0.0);
    }

    #[test]
    fn clear_emergency_moves_active_to_clearing_then_ramp_to_normal() {
        let mut mgr = manager_with_one(0);
        mgr.handle_broadcast_emergency(0);
        assert!(mgr.clear_emergency(5));
        // CLEARING -> RESUMING on this tick.
        mgr.tick(1);
        // RESUMING -> NORMAL (ramp is 1 tick by default).
        mgr.tick(2);
        let outcome = mgr.apply_value(5, 0.5, 3).unwrap();
        assert!(outcome.response.success);
    }

    #[test]
    fn clear_emergency_is_a_no_op_outside_active() {
        let mut mgr = manager_with_one(0);
        assert!(!mgr.clear_emergency(5)); // still NORMAL
    }

    #[test]
    fn runtime_watchdog_forces_active_and_raises_alert_past_cap() {
        let mut mgr = manager_with_one(10);
        mgr.apply_value(5, 1.0, 0).unwrap();
        let alerts = mgr.tick(20); // 20 > runtime_active_since(0) + 10
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].1.reason, "RUNTIME_EXCEEDED");
        assert_eq!(mgr.status_of(5).unwrap().value, 0.0);
    }

    #[test]
    fn zero_max_runtime_means_unlimited() {
        let mut mgr = manager_with_one(0);
        mgr.apply_value(5, 1.0, 0).unwrap();
        let alerts = mgr.tick(1_000_000);
        assert!(alerts.is_empty());
    }

    #[test]
    fn hardware_set_failure_is_reported_without_state_change() {
        let mut mgr = ActuatorManager::new(4);
        mgr.register(
            5,
            0,
            Box::new(FakeDriver {
                value: 0.0,
                fail_next: true,
            }),
        )
        .unwrap();
        let outcome = mgr.apply_value(5, 0.5, 0).unwrap();
        assert!(!outcome.response.success);
        assert_eq!(
            outcome.response.error_code,
            Some(ErrorCode::ActuatorSetFailed.code())
        );
    }

    #[test]
    fn clamp_rejects_non_finite_and_clamps_range() {
        assert_eq!(clamp_pwm_value(f64::NAN), None);
        assert_eq!(clamp_pwm_value(f64::INFINITY), None);
        assert_eq!(clamp_pwm_value(-0.5), Some(0.0));
        assert_eq!(clamp_pwm_value(1.5), Some(1.0));
        assert_eq!(clamp_pwm_value(0.42), Some(0.42));
    }
}
