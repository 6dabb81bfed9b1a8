//! Exponential backoff shared by the WiFi manager and the MQTT client's
//! auto-reconnect (spec §4.6: "identical to WiFi").

pub const MIN_BACKOFF_SECONDS: u64 = 1;
pub const MAX_BACKOFF_SECONDS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Backoff {
    current: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            current: MIN_BACKOFF_SECONDS,
        }
    }
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_seconds(&self) -> u64 {
        self.current
    }

    /// Doubles the delay, capped at [`MAX_BACKOFF_SECONDS`], and returns
    /// the delay to use for the next attempt.
    pub fn advance(&mut self) -> u64 {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_BACKOFF_SECONDS);
        delay
    }

    /// Success resets the backoff, per spec.md's "success resets the
    /// backoff."
    pub fn reset(&mut self) {
        self.current = MIN_BACKOFF_SECONDS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_cap() {
        let mut b = Backoff::new();
        assert_eq!(b.advance(), 1);
        assert_eq!(b.advance(), 2);
        assert_eq!(b.advance(), 4);
        assert_eq!(b.advance(), 8);
        assert_eq!(b.advance(), 16);
        assert_eq!(b.advance(), 32);
        assert_eq!(b.advance(), 60); // capped, not 64
        assert_eq!(b.advance(), 60);
    }

    #[test]
    fn reset_returns_to_the_floor() {
        let mut b = Backoff::new();
        b.advance();
        b.advance();
        b.reset();
        assert_eq!(b.current_seconds(), MIN_BACKOFF_SECONDS);
    }
}
