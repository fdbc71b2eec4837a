/*!
 * Lock-Aware Waits
 *
 * The monitor pattern: attach while the caller's lock is held, release it
 * only for the duration of the block, reacquire before returning. Attaching
 * first is what makes a notify issued right after the release impossible to
 * miss.
 */

use super::config::WaitFlags;
use super::entry::ConditionVariableEntry;
use super::variable::ConditionVariable;
use crate::core::errors::WaitResult;
use parking_lot::{MutexGuard, ReentrantMutexGuard};
use std::time::Duration;

/// A held lock that can be released around a blocking call
pub trait ReleasableLock {
    /// Release the lock, run `f`, and reacquire the lock before returning
    fn release_during<R, F: FnOnce() -> R>(&mut self, f: F) -> R;
}

impl<T: ?Sized> ReleasableLock for MutexGuard<'_, T> {
    fn release_during<R, F: FnOnce() -> R>(&mut self, f: F) -> R {
        MutexGuard::unlocked(self, f)
    }
}

/// Only this guard's level is released; an outer guard on the same lock
/// keeps it held across the wait.
impl<T: ?Sized> ReleasableLock for ReentrantMutexGuard<'_, T> {
    fn release_during<R, F: FnOnce() -> R>(&mut self, f: F) -> R {
        ReentrantMutexGuard::unlocked(self, f)
    }
}

impl ConditionVariable {
    /// Wait with `lock` released, reacquiring it before returning
    pub fn wait_locked<L: ReleasableLock>(
        &self,
        lock: &mut L,
        flags: WaitFlags,
        timeout: Duration,
    ) -> WaitResult {
        let mut entry = ConditionVariableEntry::new();
        self.add(&mut entry);
        lock.release_during(|| entry.wait(flags, timeout))
    }
}
