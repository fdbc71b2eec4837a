/*!
 * Wait Entry
 *
 * A per-wait record owned by the waiting thread. It links the thread to at
 * most one condition variable at a time and is detached exactly once, by
 * whichever of notify, timeout, interruption, or drop gets there first.
 */

use super::config::WaitFlags;
use super::system::system;
use super::variable::{VariableCore, VariableRef};
use super::waiter::Waiter;
use crate::core::errors::{CondvarError, CondvarResult, WaitError, WaitResult};
use crate::core::types::ObjectKey;
use crate::scheduler::{ThreadId, WakeReason};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{trace, warn};

struct Attachment {
    /// Weak so an entry never keeps a discarded variable alive
    variable: Weak<VariableCore>,
    waiter: Arc<Waiter>,
}

/// Explicit wait record for the add-then-wait protocol
///
/// Attach it (with [`ConditionVariable::add`] or [`add`] by object key)
/// while the condition is still guarded, release the guard, then [`wait`].
/// Dropping an attached entry detaches it.
///
/// [`ConditionVariable::add`]: super::ConditionVariable::add
/// [`add`]: ConditionVariableEntry::add
/// [`wait`]: ConditionVariableEntry::wait
#[derive(Default)]
pub struct ConditionVariableEntry {
    attachment: Option<Attachment>,
    thread: Option<ThreadId>,
    wait_status: Option<WaitResult>,
}

impl ConditionVariableEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the variable published under `object`
    ///
    /// On failure the entry stays detached and a later `wait` returns
    /// `NotFound` without blocking.
    pub fn add(&mut self, object: ObjectKey) -> CondvarResult<()> {
        self.prepare_attach();
        let system = system();
        let thread = system.scheduler().current_thread();

        let attached = system
            .registry()
            .lookup_and_lock(object, |variable, entries| {
                (Arc::downgrade(variable), variable.attach_locked(entries, thread))
            });

        match attached {
            Some((variable, waiter)) => {
                self.thread = Some(thread);
                self.attachment = Some(Attachment { variable, waiter });
                Ok(())
            }
            None => {
                self.wait_status = Some(Err(WaitError::NotFound));
                Err(CondvarError::NotFound(object))
            }
        }
    }

    /// Block until notified, timed out, or interrupted
    ///
    /// Returns immediately if the entry was already notified, or with the
    /// previous outcome if it is no longer attached.
    pub fn wait(&mut self, flags: WaitFlags, timeout: Duration) -> WaitResult {
        let waiter = match &self.attachment {
            Some(attachment) => attachment.waiter.clone(),
            None => return self.wait_status.unwrap_or(Err(WaitError::NotFound)),
        };

        let reason = if waiter.is_waiting() {
            system().scheduler().block_current_thread(
                waiter.channel(),
                flags.deadline(timeout),
                flags.is_interruptible(),
                &|| waiter.is_waiting(),
            )
        } else {
            WakeReason::NotBlocked
        };

        // A timeout or interruption still finds the entry attached unless a
        // notifier got to it first
        let result = if reason.is_self_wake() && self.detach() {
            match reason {
                WakeReason::Interrupted => Err(WaitError::Interrupted),
                _ => Err(WaitError::TimedOut),
            }
        } else if let Some(result) = waiter.result() {
            self.attachment = None;
            result
        } else if self.detach() {
            warn!(thread = %waiter.thread(), ?reason, "Woken without a wait result");
            Err(WaitError::TimedOut)
        } else {
            waiter.result().unwrap_or(Err(WaitError::NotFound))
        };

        trace!(thread = %waiter.thread(), ?reason, ?result, "Wait finished");
        self.wait_status = Some(result);
        result
    }

    /// Add by object key, then wait
    pub fn wait_object(
        &mut self,
        object: ObjectKey,
        flags: WaitFlags,
        timeout: Duration,
    ) -> WaitResult {
        self.add(object)?;
        self.wait(flags, timeout)
    }

    /// The variable this entry is attached to, if any
    pub fn variable(&self) -> Option<VariableRef> {
        let attachment = self.attachment.as_ref()?;
        let variable = attachment.variable.upgrade()?;
        let attached = variable
            .lock_entries()
            .contains_key(&attachment.waiter.ticket());
        attached.then(|| VariableRef::new(variable))
    }

    pub fn is_attached(&self) -> bool {
        self.variable().is_some()
    }

    /// Thread that last attached this entry
    pub fn thread(&self) -> Option<ThreadId> {
        self.thread
    }

    /// Outcome of the last completed wait or failed add
    pub fn wait_status(&self) -> Option<WaitResult> {
        self.wait_status
    }

    /// Called before attaching; an entry must not be attached twice
    pub(crate) fn prepare_attach(&mut self) {
        let was_attached = self.detach();
        if was_attached {
            warn!(thread = ?self.thread, "Wait entry re-added while still attached");
        }
        debug_assert!(!was_attached, "wait entry added while still attached");
        self.wait_status = None;
    }

    pub(crate) fn attach(&mut self, variable: &Arc<VariableCore>, waiter: Arc<Waiter>) {
        self.thread = Some(waiter.thread());
        self.attachment = Some(Attachment {
            variable: Arc::downgrade(variable),
            waiter,
        });
    }

    /// Detach under the variable's lock; true only if this call removed it
    fn detach(&mut self) -> bool {
        let Some(attachment) = self.attachment.take() else {
            return false;
        };
        let Some(variable) = attachment.variable.upgrade() else {
            return false;
        };
        let mut entries = variable.lock_entries();
        variable.detach_locked(&mut entries, attachment.waiter.ticket())
    }
}

impl Drop for ConditionVariableEntry {
    fn drop(&mut self) {
        if self.detach() {
            trace!(thread = ?self.thread, "Detached abandoned wait entry");
        }
    }
}
