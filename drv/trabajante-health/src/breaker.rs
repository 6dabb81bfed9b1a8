//! Per-subsystem circuit breaker (spec §4.7): after a consecutive-failure
//! threshold the subsystem is quiesced, then probed again on an
//! increasing backoff schedule.

const MIN_RECOVERY_SECONDS: u64 = 1;
const MAX_RECOVERY_SECONDS: u64 = 60;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakerState {
    Closed,
    Open,
}

pub struct CircuitBreaker {
    threshold: u32,
    consecutive_failures: u32,
    state: BreakerState,
    recovery_delay: u64,
    next_retry_at: u64,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: 0,
            state: BreakerState::Closed,
            recovery_delay: MIN_RECOVERY_SECONDS,
            next_retry_at: 0,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }

    /// `true` once the subsystem may attempt recovery this tick — always
    /// true while closed, gated by the backoff schedule while open.
    pub fn may_attempt(&self, now: u64) -> bool {
        self.state == BreakerState::Closed || now >= self.next_retry_at
    }

    pub fn record_failure(&mut self, now: u64) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            self.state = BreakerState::Open;
            self.next_retry_at = now + self.recovery_delay;
            self.recovery_delay = (self.recovery_delay * 2).min(MAX_RECOVERY_SECONDS);
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = BreakerState::Closed;
        self.recovery_delay = MIN_RECOVERY_SECONDS;
    }
}
