/*!
 * Scheduler Types
 * Domain types exchanged between blocking primitives and the thread scheduler
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kernel thread identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(u64);

impl ThreadId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address a blocked thread sleeps on
///
/// Every wait attempt gets its own channel, so a wakeup aimed at a finished
/// wait can never land on a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitChannel(usize);

impl WaitChannel {
    #[inline]
    pub fn of<T>(object: &T) -> Self {
        Self(object as *const T as usize)
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }
}

/// Why `block_current_thread` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Woken by `wake_thread` on the blocking channel
    Notified,
    /// The wait condition no longer held when the thread was about to sleep
    NotBlocked,
    /// The deadline passed
    TimedOut,
    /// An interruption was delivered to an interruptible wait
    Interrupted,
}

impl WakeReason {
    /// Whether the waiter itself must detach from its variable
    #[inline]
    pub const fn is_self_wake(self) -> bool {
        matches!(self, Self::TimedOut | Self::Interrupted)
    }
}
