/*!
 * Condition Variables
 *
 * Blocking wait/notify for kernel threads, keyed optionally by the identity
 * of the object whose state change is being waited for.
 *
 * # Architecture
 *
 * - **Registry**: process-wide map from object key to published variable,
 *   used by notify-by-key and add-by-key
 * - **ConditionVariable**: per-variable lock, FIFO of attached waiters, and
 *   a lock-free waiter count for fast-path checks
 * - **ConditionVariableEntry**: per-wait record owned by the waiting thread
 * - **Lock-aware waits**: monitor pattern over a caller-held lock
 *
 * Lock order is registry, then variable. No lock is held across a block.
 *
 * # Examples
 *
 * ```
 * use kernel_condvar::{ConditionVariable, WaitError, WaitFlags};
 * use std::sync::Arc;
 * use std::thread;
 * use std::time::Duration;
 *
 * let cv = Arc::new(ConditionVariable::new());
 * let waiter = {
 *     let cv = cv.clone();
 *     thread::spawn(move || cv.wait(WaitFlags::RELATIVE_TIMEOUT, Duration::from_secs(5)))
 * };
 *
 * while cv.entries_count() == 0 {
 *     thread::yield_now();
 * }
 * cv.notify_all_with(Err(WaitError::Aborted(-1)));
 * assert_eq!(waiter.join().unwrap(), Err(WaitError::Aborted(-1)));
 * ```
 */

mod config;
mod dump;
mod entry;
mod locks;
mod registry;
mod system;
mod variable;
mod waiter;

// Re-export public API
pub use config::{CondvarConfig, WaitFlags};
pub use dump::VariableSnapshot;
pub use entry::ConditionVariableEntry;
pub use locks::ReleasableLock;
pub use registry::RegistryCursor;
pub use system::{init, init_with, init_with_config, is_initialized, thread_scheduler};
pub use variable::{ConditionVariable, VariableRef};
