//! Fixed-size PWM channel pool. The ESP32 LEDC peripheral exposes a small
//! number of independent channels; actuator drivers that need duty-cycle
//! control borrow one from this pool at `begin()` and return it at `end()`.

use trabajante_proto::ErrorCode;

/// Channels available on the smallest supported board (ESP32-C3's LEDC has
/// 6 usable channels once the two reserved for system tone/beep use are
/// excluded). Larger boards still only hand out this many so a driver
/// written against the pool behaves identically across boards.
pub const POOL_SIZE: usize = 6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PwmChannel(pub u8);

pub struct PwmPool {
    taken: [bool; POOL_SIZE],
}

impl Default for PwmPool {
    fn default() -> Self {
        Self {
            taken: [false; POOL_SIZE],
        }
    }
}

impl PwmPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the lowest-numbered free channel, or
    /// [`ErrorCode::PwmChannelFull`] once all [`POOL_SIZE`] are in use.
    pub fn acquire(&mut self) -> Result<PwmChannel, ErrorCode> {
        for (i, slot) in self.taken.iter_mut().enumerate() {
            if !*slot {
                *slot = true;
                return Ok(PwmChannel(i as u8));
            }
        }
        Err(ErrorCode::PwmChannelFull)
    }

    /// A no-op if the channel isn't currently held, matching the arbiter's
    /// release semantics.
    pub fn release(&mut self, channel: PwmChannel) {
        if let Some(slot) = self.taken.get_mut(channel.0 as usize) {
            *slot = false;
        }
    }

    pub fn in_use(&self) -> usize {
        self.taken.iter().filter(|&&t| t).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_channels_in_ascending_order() {
        let mut pool = PwmPool::new();
        assert_eq!(pool.acquire().unwrap(), PwmChannel(0));
        assert_eq!(pool.acquire().unwrap(), PwmChannel(1));
    }

    #[test]
    fn exhausting_the_pool_reports_pwm_channel_full() {
        let mut pool = PwmPool::new();
        for _ in 0..POOL_SIZE {
            pool.acquire().unwrap();
        }
        assert_eq!(pool.acquire(), Err(ErrorCode::PwmChannelFull));
        assert_eq!(pool.in_use(), POOL_SIZE);
    }

    #[test]
    fn released_channel_can_be_reacquired() {
        let mut pool = PwmPool::new();
        let ch = pool.acquire().unwrap();
        pool.release(ch);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.acquire().unwrap(), ch);
    }

    #[test]
    fn releasing_an_unheld_channel_is_a_no_op() {
        let mut pool = PwmPool::new();
        pool.release(PwmChannel(3));
        assert_eq!(pool.in_use(), 0);
    }
}
