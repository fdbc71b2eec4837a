/*!
 * Scheduler Traits
 * Interface the condition variable subsystem consumes from the thread scheduler
 */

use super::types::{ThreadId, WaitChannel, WakeReason};
use crate::core::errors::WaitResult;
use std::time::Instant;

/// Thread blocking and wakeup services
///
/// Implementations must be:
/// - **Lost-wakeup free**: `still_waiting` is evaluated atomically with
///   respect to `wake_thread` on the same channel
/// - **Channel exact**: a wake on one channel never releases a thread blocked
///   on another
pub trait ThreadScheduler: Send + Sync {
    /// Identity of the calling thread
    fn current_thread(&self) -> ThreadId;

    /// Block the calling thread on `channel`
    ///
    /// Returns `NotBlocked` without sleeping if `still_waiting` is false. The
    /// callback runs inside the scheduler's queue lock, so it must be a plain
    /// atomic read.
    fn block_current_thread(
        &self,
        channel: WaitChannel,
        deadline: Option<Instant>,
        interruptible: bool,
        still_waiting: &dyn Fn() -> bool,
    ) -> WakeReason;

    /// Wake `thread` if it is blocked on `channel`
    ///
    /// `result` has already been published to the waiter; it is passed for
    /// tracing only. Returns whether a thread was released.
    fn wake_thread(&self, thread: ThreadId, channel: WaitChannel, result: &WaitResult) -> bool;

    /// Post an interruption to `thread`
    ///
    /// An interruptible wait in progress returns `Interrupted`; otherwise the
    /// interruption stays pending until the next interruptible wait. Threads
    /// that have exited (or never called `current_thread`) are ignored.
    fn interrupt(&self, thread: ThreadId) -> bool;

    /// Scheduler name for diagnostics
    fn name(&self) -> &'static str;
}
