/*!
 * System Clock
 * Monotonic time since subsystem start, the base for absolute wait timeouts
 */

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Global system start time for absolute timeouts
pub static SYSTEM_START: OnceLock<Instant> = OnceLock::new();

/// Instant the clock started counting from
#[inline]
pub fn boot_instant() -> Instant {
    *SYSTEM_START.get_or_init(Instant::now)
}

/// Time elapsed since boot
#[inline]
pub fn system_time() -> Duration {
    boot_instant().elapsed()
}

/// Convert an absolute time since boot into an `Instant`
#[inline]
pub fn instant_at(since_boot: Duration) -> Option<Instant> {
    boot_instant().checked_add(since_boot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_is_monotonic() {
        let first = system_time();
        std::thread::sleep(Duration::from_millis(2));
        assert!(system_time() > first);
    }

    #[test]
    fn test_instant_at_round_trip() {
        let now = system_time();
        let at = instant_at(now).unwrap();
        assert!(at <= Instant::now());
    }
}
