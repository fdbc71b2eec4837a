/*!
 * Diagnostics
 *
 * Read-only snapshots for debugger-style inspection. Capturing never blocks:
 * a busy lock is reported instead of waited on.
 */

use super::variable::VariableCore;
use crate::core::types::ObjectKey;
use crate::scheduler::ThreadId;
use std::fmt;

/// Point-in-time view of one condition variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSnapshot {
    pub id: u64,
    pub object: ObjectKey,
    pub object_type: &'static str,
    pub published: bool,
    pub entries_count: usize,
    /// Waiting threads in wake order, `None` if the entry lock was busy
    pub waiting_threads: Option<Vec<ThreadId>>,
}

impl VariableSnapshot {
    pub(crate) fn capture(variable: &VariableCore, entry_limit: usize) -> Self {
        let identity = variable.try_identity();
        let waiting_threads = variable.try_lock_entries().map(|entries| {
            entries
                .values()
                .take(entry_limit)
                .map(|waiter| waiter.thread())
                .collect()
        });

        Self {
            id: variable.id(),
            object: identity.map(|i| i.object).unwrap_or_default(),
            object_type: identity.map(|i| i.object_type).unwrap_or("?"),
            published: identity.map_or(false, |i| i.published.is_some()),
            entries_count: variable.entries_count(),
            waiting_threads,
        }
    }

    /// Whether the thread list omits some waiters
    pub fn is_truncated(&self) -> bool {
        self.waiting_threads
            .as_ref()
            .map_or(false, |threads| threads.len() < self.entries_count)
    }
}

impl fmt::Display for VariableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "condition variable {}", self.id)?;
        writeln!(f, "  object:  {} ({})", self.object, self.object_type)?;
        writeln!(
            f,
            "  state:   {}",
            if self.published { "published" } else { "anonymous" }
        )?;
        writeln!(f, "  entries: {}", self.entries_count)?;
        write!(f, "  threads:")?;
        match &self.waiting_threads {
            Some(threads) => {
                for thread in threads {
                    write!(f, " {}", thread)?;
                }
                if self.is_truncated() {
                    write!(f, " ...")?;
                }
            }
            None => write!(f, " (busy)")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_lists_threads_in_order() {
        let variable = VariableCore::new(ObjectKey::new(0x80), "inode");
        {
            let mut entries = variable.lock_entries();
            for n in [4, 2, 9] {
                variable.attach_locked(&mut entries, ThreadId::new(n));
            }
        }

        let snapshot = VariableSnapshot::capture(&variable, 8);
        assert_eq!(snapshot.entries_count, 3);
        assert_eq!(
            snapshot.waiting_threads,
            Some(vec![ThreadId::new(4), ThreadId::new(2), ThreadId::new(9)])
        );
        assert!(!snapshot.is_truncated());

        let text = snapshot.to_string();
        assert!(text.contains("object:  0x80 (inode)"));
        assert!(text.contains("threads: 4 2 9"));
    }

    #[test]
    fn test_capture_truncates() {
        let variable = VariableCore::new(ObjectKey::NULL, "");
        {
            let mut entries = variable.lock_entries();
            for n in 0..5 {
                variable.attach_locked(&mut entries, ThreadId::new(n));
            }
        }
        let snapshot = VariableSnapshot::capture(&variable, 2);
        assert!(snapshot.is_truncated());
        assert!(snapshot.to_string().ends_with("threads: 0 1 ..."));
    }

    #[test]
    fn test_capture_does_not_block_on_busy_lock() {
        let variable = VariableCore::new(ObjectKey::NULL, "");
        let _held = variable.lock_entries();
        let snapshot = VariableSnapshot::capture(&variable, 8);
        assert_eq!(snapshot.waiting_threads, None);
        assert!(snapshot.to_string().ends_with("threads: (busy)"));
    }
}
