/*!
 * Condition Variable Configuration
 *
 * Runtime configuration for the subsystem and per-wait flags
 */

use crate::core::limits::{DEFAULT_DUMP_ENTRY_LIMIT, DEFAULT_REGISTRY_CAPACITY};
use crate::core::time::instant_at;
use bitflags::bitflags;
use std::time::{Duration, Instant};
use tracing::warn;

bitflags! {
    /// Flags controlling a single wait
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WaitFlags: u32 {
        /// An interruption posted to the thread ends the wait
        const CAN_INTERRUPT = 0x01;
        /// The timeout is relative to the start of the wait
        const RELATIVE_TIMEOUT = 0x08;
        /// The timeout is an absolute time since boot
        const ABSOLUTE_TIMEOUT = 0x10;
    }
}

impl WaitFlags {
    /// Resolve a timeout argument into a deadline
    ///
    /// Returns `None` for an unbounded wait. Deadlines too far in the future
    /// to represent are treated as unbounded.
    pub fn deadline(self, timeout: Duration) -> Option<Instant> {
        if self.contains(Self::RELATIVE_TIMEOUT) {
            Instant::now().checked_add(timeout)
        } else if self.contains(Self::ABSOLUTE_TIMEOUT) {
            instant_at(timeout)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_interruptible(self) -> bool {
        self.contains(Self::CAN_INTERRUPT)
    }
}

/// Subsystem configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondvarConfig {
    /// Initial capacity of the object registry
    pub registry_capacity: usize,
    /// Waiting threads listed per variable in dumps
    pub dump_entry_limit: usize,
}

impl Default for CondvarConfig {
    fn default() -> Self {
        Self {
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            dump_entry_limit: DEFAULT_DUMP_ENTRY_LIMIT,
        }
    }
}

impl CondvarConfig {
    /// Defaults overridden by `CONDVAR_REGISTRY_CAPACITY` and
    /// `CONDVAR_DUMP_ENTRY_LIMIT`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            registry_capacity: env_usize("CONDVAR_REGISTRY_CAPACITY")
                .unwrap_or(defaults.registry_capacity),
            dump_entry_limit: env_usize("CONDVAR_DUMP_ENTRY_LIMIT")
                .unwrap_or(defaults.dump_entry_limit),
        }
    }
}

fn env_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = name, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}
