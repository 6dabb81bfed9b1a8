//! The per-actuator emergency state machine (spec §4.4). Kept as a plain
//! enum with an explicit transition function rather than folded into the
//! driver, so the manager can reason about it independent of hardware.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmergencyState {
    Normal,
    Active,
    Clearing,
    Resuming,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    EmergencyStop,
    ClearCommand,
    RampComplete,
    ResumeComplete,
}

impl EmergencyState {
    /// Applies one transition, returning the new state. Transitions not
    /// valid from the current state are no-ops (the diagram in spec.md
    /// §4.4 has exactly one outgoing edge per state per trigger).
    pub fn apply(self, transition: Transition) -> Self {
        use EmergencyState::*;
        use Transition::*;
        match (self, transition) {
            (_, EmergencyStop) => Active,
            (Active, ClearCommand) => Clearing,
            (Clearing, RampComplete) => Resuming,
            (Resuming, ResumeComplete) => Normal,
            (other, _) => other,
        }
    }

    /// ACTIVE and CLEARING both force the driver to its safe default and
    /// reject value commands; only NORMAL (and, once the ramp completes,
    /// RESUMING) accept them.
    pub fn accepts_commands(self) -> bool {
        matches!(self, EmergencyState::Normal | EmergencyState::Resuming)
    }

    pub fn forces_safe_default(self) -> bool {
        matches!(self, EmergencyState::Active | EmergencyState::Clearing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EmergencyState::*;
    use Transition::*;

    #[test]
    fn normal_to_active_on_emergency_stop() {
        assert_eq!(Normal.apply(EmergencyStop), Active);
    }

    #[test]
    fn active_to_clearing_on_clear_command() {
        assert_eq!(Active.apply(ClearCommand), Clearing);
    }

    #[test]
    fn clearing_to_resuming_on_ramp_complete() {
        assert_eq!(Clearing.apply(RampComplete), Resuming);
    }

    #[test]
    fn resuming_to_normal_on_resume_complete() {
        assert_eq!(Resuming.apply(ResumeComplete), Normal);
    }

    #[test]
    fn emergency_stop_preempts_any_state() {
        assert_eq!(Clearing.apply(EmergencyStop), Active);
        assert_eq!(Resuming.apply(EmergencyStop), Active);
    }

    #[test]
    fn clear_command_is_ignored_outside_active() {
        assert_eq!(Normal.apply(ClearCommand), Normal);
        assert_eq!(Resuming.apply(ClearCommand), Resuming);
    }

    #[test]
    fn only_normal_and_resuming_accept_commands() {
        assert!(Normal.accepts_commands());
        assert!(Resuming.accepts_commands());
        assert!(!Active.accepts_commands());
        assert!(!Clearing.accepts_commands());
    }

    #[test]
    fn active_and_clearing_force_safe_default() {
        assert!(Active.forces_safe_default());
        assert!(Clearing.forces_safe_default());
        assert!(!Normal.forces_safe_default());
        assert!(!Resuming.forces_safe_default());
    }
}
