//! Aggregate health view (spec §4.7): the error ring, one circuit
//! breaker per subsystem, and the overall readiness/watchdog gate.

use std::collections::HashMap;

use trabajante_proto::error::Severity;

use crate::breaker::CircuitBreaker;
use crate::ring::{ErrorEvent, ErrorRing};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Readiness {
    Ready,
    Degraded,
    NotReady,
}

pub struct HealthMonitor {
    ring: ErrorRing,
    breakers: HashMap<String, CircuitBreaker>,
    critical_subsystems: Vec<String>,
    unacknowledged_critical: u32,
}

impl HealthMonitor {
    pub fn new(ring_capacity: usize, critical_subsystems: Vec<String>) -> Self {
        Self {
            ring: ErrorRing::new(ring_capacity),
            breakers: HashMap::new(),
            critical_subsystems,
            unacknowledged_critical: 0,
        }
    }

    pub fn register_subsystem(&mut self, name: impl Into<String>, failure_threshold: u32) {
        self.breakers
            .insert(name.into(), CircuitBreaker::new(failure_threshold));
    }

    pub fn record_failure(&mut self, subsystem: &str, now: u64) {
        if let Some(breaker) = self.breakers.get_mut(subsystem) {
            breaker.record_failure(now);
        }
    }

    pub fn record_success(&mut self, subsystem: &str) {
        if let Some(breaker) = self.breakers.get_mut(subsystem) {
            breaker.record_success();
        }
    }

    pub fn may_attempt(&self, subsystem: &str, now: u64) -> bool {
        self.breakers
            .get(subsystem)
            .map(|b| b.may_attempt(now))
            .unwrap_or(true)
    }

    /// Records an error event; critical severity additionally raises the
    /// unacknowledged count that gates the watchdog feed until a human or
    /// server action acknowledges it.
    pub fn record_error(&mut self, event: ErrorEvent) {
        if event.severity == Severity::Critical {
            self.unacknowledged_critical += 1;
        }
        self.ring.push(event);
    }

    pub fn acknowledge_critical(&mut self) {
        self.unacknowledged_critical = 0;
    }

    pub fn recent_errors(&self, n: usize) -> Vec<&ErrorEvent> {
        self.ring.recent(n)
    }

    pub fn readiness(&self) -> Readiness {
        let any_critical_open = self
            .critical_subsystems
            .iter()
            .any(|name| self.breakers.get(name).map(|b| b.is_open()).unwrap_or(false));
        if any_critical_open || self.unacknowledged_critical > 0 {
            return Readiness::NotReady;
        }
        if self.breakers.values().any(|b| b.is_open()) {
            return Readiness::Degraded;
        }
        Readiness::Ready
    }

    /// Blocked while any critical subsystem's breaker is open or while
    /// any critical error is unacknowledged, so a genuinely hung device
    /// reboots instead of falsely appearing live (spec.md §4.7).
    pub fn watchdog_feed_allowed(&self) -> bool {
        let any_critical_open = self
            .critical_subsystems
            .iter()
            .any(|name| self.breakers.get(name).map(|b| b.is_open()).unwrap_or(false));
        !any_critical_open && self.unacknowledged_critical == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trabajante_proto::error::ErrorCode;

    fn event(severity: Severity) -> ErrorEvent {
        ErrorEvent {
            code: ErrorCode::WifiConnectFailed,
            severity,
            component: "wifi".to_string(),
            gpio: None,
            message: "down".to_string(),
            ts: 0,
        }
    }

    #[test]
    fn readiness_is_ready_with_no_open_breakers() {
        let mut monitor = HealthMonitor::new(8, vec!["wifi".to_string()]);
        monitor.register_subsystem("wifi", 3);
        assert_eq!(monitor.readiness(), Readiness::Ready);
    }

    #[test]
    fn critical_subsystem_open_makes_device_not_ready() {
        let mut monitor = HealthMonitor::new(8, vec!["wifi".to_string()]);
        monitor.register_subsystem("wifi", 1);
        monitor.record_failure("wifi", 0);
        assert_eq!(monitor.readiness(), Readiness::NotReady);
    }

    #[test]
    fn non_critical_subsystem_open_is_only_degraded() {
        let mut monitor = HealthMonitor::new(8, vec!["wifi".to_string()]);
        monitor.register_subsystem("sensor:34", 1);
        monitor.record_failure("sensor:34", 0);
        assert_eq!(monitor.readiness(), Readiness::Degraded);
    }

    #[test]
    fn watchdog_blocked_while_critical_error_unacknowledged() {
        let mut monitor = HealthMonitor::new(8, vec![]);
        assert!(monitor.watchdog_feed_allowed());
        monitor.record_error(event(Severity::Critical));
        assert!(!monitor.watchdog_feed_allowed());
        monitor.acknowledge_critical();
        assert!(monitor.watchdog_feed_allowed());
    }

    #[test]
    fn watchdog_blocked_while_critical_subsystem_breaker_open() {
        let mut monitor = HealthMonitor::new(8, vec!["mqtt".to_string()]);
        monitor.register_subsystem("mqtt", 1);
        assert!(monitor.watchdog_feed_allowed());
        monitor.record_failure("mqtt", 0);
        assert!(!monitor.watchdog_feed_allowed());
    }
}
