/*!
 * Synchronization Primitives
 *
 * Kernel wait/notify primitives built on the scheduler's block and wake
 * services.
 */

pub mod condvar;

pub use condvar::{
    ConditionVariable, ConditionVariableEntry, CondvarConfig, ReleasableLock, RegistryCursor,
    VariableRef, VariableSnapshot, WaitFlags,
};
