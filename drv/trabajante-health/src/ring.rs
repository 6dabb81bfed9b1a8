//! A bounded ring buffer of error events (spec §4.7). Once full, the
//! oldest entry is overwritten rather than the push being rejected — the
//! same overwrite-on-full semantics as the ring buffer macro this is
//! modeled on, just sized and typed for this firmware's diagnostics use
//! rather than expressed as a macro over a static slot.

use trabajante_proto::error::{ErrorCode, Severity};

#[derive(Clone, Debug, PartialEq)]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub severity: Severity,
    pub component: String,
    pub gpio: Option<u8>,
    pub message: String,
    pub ts: u64,
}

pub struct ErrorRing {
    capacity: usize,
    entries: Vec<ErrorEvent>,
    next: usize,
    filled: bool,
}

impl ErrorRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
            next: 0,
            filled: false,
        }
    }

    pub fn push(&mut self, event: ErrorEvent) {
        if self.entries.len() < self.capacity {
            self.entries.push(event);
        } else {
            self.entries[self.next] = event;
            self.filled = true;
        }
        self.next = (self.next + 1) % self.capacity.max(1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns up to `n` most recent entries, oldest first, for a
    /// diagnostics publish.
    pub fn recent(&self, n: usize) -> Vec<&ErrorEvent> {
        if self.entries.len() <= n {
            return self.entries.iter().collect();
        }
        if !self.filled {
            return self.entries[self.entries.len() - n..].iter().collect();
        }
        let mut out = Vec::with_capacity(n);
        let start = (self.next + self.capacity - n) % self.capacity;
        for i in 0..n {
            out.push(&self.entries[(start + i) % self.capacity]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: u64) -> ErrorEvent {
        ErrorEvent {
            code: ErrorCode::SensorReadFailed,
            severity: Severity::Warning,
            component: "sensor".to_string(),
            gpio: Some(34),
            message: "timeout".to_string(),
            ts,
        }
    }

    #[test]
    fn recent_returns_everything_under_capacity() {
        let mut ring = ErrorRing::new(4);
        ring.push(event(1));
        ring.push(event(2));
        let recent = ring.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].ts, 1);
        assert_eq!(recent[1].ts, 2);
    }

    #[test]
    fn full_ring_overwrites_oldest_and_recent_stays_chronological() {
        let mut ring = ErrorRing::new(3);
        for ts in 1..=5 {
            ring.push(event(ts));
        }
        let recent = ring.recent(3);
        let timestamps: Vec<u64> = recent.iter().map(|e| e.ts).collect();
        assert_eq!(timestamps, vec![3, 4, 5]);
    }
}
