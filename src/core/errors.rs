/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::ObjectKey;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a wait, and the value a notifier hands to the threads it wakes
pub type WaitResult = Result<(), WaitError>;

/// Result type for registry and lifecycle operations
pub type CondvarResult<T> = Result<T, CondvarError>;

/// Reasons a wait ended without a successful notification
#[derive(Error, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum WaitError {
    #[error("Wait timed out")]
    #[diagnostic(
        code(condvar::timed_out),
        help("No notification arrived before the timeout elapsed.")
    )]
    TimedOut,

    #[error("Wait was interrupted")]
    #[diagnostic(
        code(condvar::interrupted),
        help("The thread was interrupted during an interruptible wait.")
    )]
    Interrupted,

    #[error("No condition variable to wait on")]
    #[diagnostic(
        code(condvar::not_found),
        help("The object key is not published, or its variable was unpublished while waiting.")
    )]
    NotFound,

    #[error("Wait aborted by notifier with code {0}")]
    #[diagnostic(
        code(condvar::aborted),
        help("The notifier woke this waiter with a failure status.")
    )]
    Aborted(i32),
}

/// Registry and lifecycle errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum CondvarError {
    #[error("Cannot publish a condition variable under the null object")]
    #[diagnostic(
        code(condvar::null_object),
        help("Use ConditionVariable::init for anonymous variables.")
    )]
    NullObject,

    #[error("Object {0} already has a published condition variable")]
    #[diagnostic(
        code(condvar::key_in_use),
        help("Unpublish the existing variable before publishing another one for this object.")
    )]
    KeyInUse(ObjectKey),

    #[error("Condition variable is already published under {0}")]
    #[diagnostic(
        code(condvar::already_published),
        help("A variable can be published under one object at a time.")
    )]
    AlreadyPublished(ObjectKey),

    #[error("No condition variable published for object {0}")]
    #[diagnostic(
        code(condvar::not_found),
        help("Nobody published a variable for this object, or it was unpublished.")
    )]
    NotFound(ObjectKey),

    #[error("Condition variable subsystem already initialized")]
    #[diagnostic(
        code(condvar::already_initialized),
        help("init() must be called exactly once per process.")
    )]
    AlreadyInitialized,
}

impl From<CondvarError> for WaitError {
    fn from(_: CondvarError) -> Self {
        WaitError::NotFound
    }
}

// Wait results are stored in a single atomic word so that the scheduler's
// validate callback can read them without taking a lock. Zero means "still
// waiting".
const TAG_OK: u64 = 1;
const TAG_TIMED_OUT: u64 = 2;
const TAG_INTERRUPTED: u64 = 3;
const TAG_NOT_FOUND: u64 = 4;
const TAG_ABORTED: u64 = 5;
const TAG_MASK: u64 = 0xff;

pub(crate) fn encode_wait_result(result: &WaitResult) -> u64 {
    match result {
        Ok(()) => TAG_OK,
        Err(WaitError::TimedOut) => TAG_TIMED_OUT,
        Err(WaitError::Interrupted) => TAG_INTERRUPTED,
        Err(WaitError::NotFound) => TAG_NOT_FOUND,
        Err(WaitError::Aborted(code)) => ((*code as u32 as u64) << 8) | TAG_ABORTED,
    }
}

pub(crate) fn decode_wait_result(word: u64) -> Option<WaitResult> {
    match word & TAG_MASK {
        TAG_OK => Some(Ok(())),
        TAG_TIMED_OUT => Some(Err(WaitError::TimedOut)),
        TAG_INTERRUPTED => Some(Err(WaitError::Interrupted)),
        TAG_NOT_FOUND => Some(Err(WaitError::NotFound)),
        TAG_ABORTED => Some(Err(WaitError::Aborted((word >> 8) as u32 as i32))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_abort_code_survives_encoding() {
        let result: WaitResult = Err(WaitError::Aborted(-22));
        assert_eq!(decode_wait_result(encode_wait_result(&result)), Some(result));
    }

    #[test]
    fn test_zero_word_means_waiting() {
        assert_eq!(decode_wait_result(0), None);
    }

    #[test]
    fn test_error_messages() {
        let err = CondvarError::KeyInUse(ObjectKey::new(0x40));
        assert_eq!(
            err.to_string(),
            "Object 0x40 already has a published condition variable"
        );
        assert_eq!(
            WaitError::from(CondvarError::NotFound(ObjectKey::new(0x40))),
            WaitError::NotFound
        );
    }
}
