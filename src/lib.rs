/*!
 * Kernel Condition Variables
 *
 * Blocking wait/notify primitive for kernel threads: wait on an object's
 * condition variable, and wake one or all waiters by direct reference or by
 * the object's key.
 */

pub mod core;
pub mod monitoring;
pub mod scheduler;

// Re-exports
pub use crate::core::errors::{CondvarError, CondvarResult, WaitError, WaitResult};
pub use crate::core::sync::condvar::{
    init, init_with, init_with_config, is_initialized, thread_scheduler, ConditionVariable,
    ConditionVariableEntry, CondvarConfig, ReleasableLock, RegistryCursor, VariableRef,
    VariableSnapshot, WaitFlags,
};
pub use crate::core::time::system_time;
pub use crate::core::types::ObjectKey;
pub use monitoring::init_tracing;
pub use scheduler::{ParkingScheduler, ThreadId, ThreadScheduler};
