//! Logical clock driving LRU-approximate eviction.
//!
//! Mirrors the wraparound arithmetic of the source system: a tick is a
//! coarse, wrapping counter rather than a wall-clock timestamp, so that
//! idle-time comparisons stay cheap to compute and store (a single `f64`
//! per key) at the cost of precision beyond `resolution`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Ticks wrap at this value; chosen to match the source system exactly.
pub const LRU_CLOCK_MAX: u64 = (1 << 24) - 1;

#[derive(Debug, Clone, Copy)]
pub struct LruClock {
    resolution: f64,
}

impl LruClock {
    pub fn new(resolution: f64) -> Self {
        LruClock { resolution }
    }

    fn now_seconds() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs_f64()
    }

    /// Current logical tick, wrapped at [`LRU_CLOCK_MAX`].
    pub fn now_tick(&self) -> f64 {
        let raw = (Self::now_seconds() / self.resolution).floor();
        raw % (LRU_CLOCK_MAX as f64 + 1.0)
    }

    /// Milliseconds of idle time since `entry_tick`, accounting for
    /// wraparound when the clock has cycled since the entry was stamped.
    pub fn idle(&self, entry_tick: f64) -> f64 {
        let now = self.now_tick();
        let ticks = if now >= entry_tick {
            now - entry_tick
        } else {
            (LRU_CLOCK_MAX as f64 + 1.0) - entry_tick + now
        };
        ticks * self.resolution * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_tick_stays_within_bounds() {
        let clock = LruClock::new(0.01);
        let tick = clock.now_tick();
        assert!(tick >= 0.0);
        assert!(tick <= LRU_CLOCK_MAX as f64);
    }

    #[test]
    fn idle_grows_for_older_ticks() {
        let clock = LruClock::new(0.01);
        let now = clock.now_tick();
        let idle_recent = clock.idle(now);
        let older = if now >= 5.0 { now - 5.0 } else { LRU_CLOCK_MAX as f64 - 5.0 + now };
        let idle_older = clock.idle(older);
        assert!(idle_older >= idle_recent);
    }

    #[test]
    fn idle_handles_wraparound() {
        let clock = LruClock::new(0.01);
        // entry tick just after the wrap point, "now" near zero: should
        // report a small idle time, not a huge one.
        let idle = clock.idle(LRU_CLOCK_MAX as f64);
        assert!(idle < (LRU_CLOCK_MAX as f64) * 0.01 * 1000.0);
    }
}
