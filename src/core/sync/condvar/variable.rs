/*!
 * Condition Variable
 *
 * An addressable wait point. Threads attach wait entries and block; notifiers
 * detach the oldest entry (or all of them), publish the wake result, and wake
 * the owning threads.
 *
 * # Locking
 *
 * Each variable has its own short-held entry lock guarding the FIFO of
 * attached waiters and their membership. Membership is the back-reference:
 * an entry is attached exactly while its ticket is in the FIFO, so removing
 * the ticket under the lock is the single compare-and-clear every detach path
 * (notify, timeout, interruption, abandonment) races on. Scheduler wakeups
 * happen after the lock is released.
 */

use super::config::WaitFlags;
use super::dump::VariableSnapshot;
use super::entry::ConditionVariableEntry;
use super::registry::RegistryCursor;
use super::system::system;
use super::waiter::Waiter;
use crate::core::errors::{CondvarResult, WaitError, WaitResult};
use crate::core::types::ObjectKey;
use crate::scheduler::ThreadId;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Attached waiters keyed by ticket; ascending tickets are attach order
pub(crate) type EntryList = BTreeMap<u64, Arc<Waiter>>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Identity {
    pub(crate) object: ObjectKey,
    pub(crate) object_type: &'static str,
    pub(crate) published: Option<ObjectKey>,
}

/// Shared state of a variable; the registry and entries refer to this
pub(crate) struct VariableCore {
    id: u64,
    /// Leaf lock, never held while acquiring another
    identity: RwLock<Identity>,
    entries: Mutex<EntryList>,
    entries_count: AtomicUsize,
}

impl VariableCore {
    pub(crate) fn new(object: ObjectKey, object_type: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed),
            identity: RwLock::new(Identity {
                object,
                object_type,
                published: None,
            }),
            entries: Mutex::new(EntryList::new()),
            entries_count: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn identity(&self) -> Identity {
        *self.identity.read()
    }

    pub(crate) fn try_identity(&self) -> Option<Identity> {
        self.identity.try_read().map(|identity| *identity)
    }

    fn set_identity(&self, object: ObjectKey, object_type: &'static str) {
        let mut identity = self.identity.write();
        identity.object = object;
        identity.object_type = object_type;
    }

    /// Returns the current key if the variable is already published
    pub(crate) fn mark_published(
        &self,
        object: ObjectKey,
        object_type: &'static str,
    ) -> Result<(), ObjectKey> {
        let mut identity = self.identity.write();
        if let Some(current) = identity.published {
            return Err(current);
        }
        *identity = Identity {
            object,
            object_type,
            published: Some(object),
        };
        Ok(())
    }

    pub(crate) fn take_published(&self) -> Option<ObjectKey> {
        self.identity.write().published.take()
    }

    #[inline]
    pub(crate) fn entries_count(&self) -> usize {
        self.entries_count.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn lock_entries(&self) -> MutexGuard<'_, EntryList> {
        self.entries.lock()
    }

    #[inline]
    pub(crate) fn try_lock_entries(&self) -> Option<MutexGuard<'_, EntryList>> {
        self.entries.try_lock()
    }

    pub(crate) fn attach_locked(&self, entries: &mut EntryList, thread: ThreadId) -> Arc<Waiter> {
        let waiter = Waiter::new(thread);
        entries.insert(waiter.ticket(), waiter.clone());
        self.entries_count.fetch_add(1, Ordering::Release);
        waiter
    }

    /// Remove `ticket` if still attached; true only for the caller that
    /// actually detached it
    pub(crate) fn detach_locked(&self, entries: &mut EntryList, ticket: u64) -> bool {
        if entries.remove(&ticket).is_some() {
            self.entries_count.fetch_sub(1, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Detach the head (or every) waiter and publish `result` to it
    pub(crate) fn notify_locked(
        &self,
        entries: &mut EntryList,
        all: bool,
        result: &WaitResult,
    ) -> Vec<Arc<Waiter>> {
        let mut woken = Vec::new();
        while let Some((_, waiter)) = entries.pop_first() {
            self.entries_count.fetch_sub(1, Ordering::Release);
            waiter.complete(result);
            woken.push(waiter);
            if !all {
                break;
            }
        }
        woken
    }

    pub(crate) fn notify(&self, all: bool, result: WaitResult) -> usize {
        let woken = {
            let mut entries = self.lock_entries();
            self.notify_locked(&mut entries, all, &result)
        };
        wake_waiters(woken, &result)
    }

    /// Wake every remaining waiter with `NotFound`
    fn abandon_waiters(&self, reason: &'static str) {
        let result = Err(WaitError::NotFound);
        let woken = {
            let mut entries = self.lock_entries();
            self.notify_locked(&mut entries, true, &result)
        };
        if !woken.is_empty() {
            warn!(
                variable = self.id,
                waiters = woken.len(),
                reason,
                "Condition variable released with waiters attached"
            );
        }
        wake_waiters(woken, &result);
    }
}

/// Hand detached waiters to the scheduler; the entry lock must not be held
fn wake_waiters(woken: Vec<Arc<Waiter>>, result: &WaitResult) -> usize {
    if woken.is_empty() {
        return 0;
    }
    let scheduler = system().scheduler();
    for waiter in &woken {
        scheduler.wake_thread(waiter.thread(), waiter.channel(), result);
    }
    woken.len()
}

/// A kernel condition variable
///
/// Usually embedded in the object it guards. Dropping a published variable
/// unpublishes it; waiters still attached at that point are woken with
/// `WaitError::NotFound`.
///
/// # Examples
///
/// ```
/// use kernel_condvar::{ConditionVariable, ConditionVariableEntry, ObjectKey, WaitFlags};
/// use std::time::Duration;
///
/// let resource = Box::new(0u32);
/// let key = ObjectKey::of(&*resource);
///
/// let cv = ConditionVariable::new();
/// cv.publish(key, "resource").unwrap();
///
/// let mut entry = ConditionVariableEntry::new();
/// entry.add(key).unwrap();
/// assert_eq!(ConditionVariable::notify_one_object(key, Ok(())), 1);
/// assert_eq!(entry.wait(WaitFlags::RELATIVE_TIMEOUT, Duration::from_secs(1)), Ok(()));
/// ```
pub struct ConditionVariable {
    core: Arc<VariableCore>,
}

impl ConditionVariable {
    /// Create an anonymous variable
    pub fn new() -> Self {
        Self {
            core: VariableCore::new(ObjectKey::NULL, ""),
        }
    }

    /// Create an anonymous variable labelled for diagnostics
    pub fn with_object(object: ObjectKey, object_type: &'static str) -> Self {
        Self {
            core: VariableCore::new(object, object_type),
        }
    }

    /// Reset identity for use as an anonymous variable
    ///
    /// Does not touch the registry. Waiters still attached are woken with
    /// `NotFound`.
    pub fn init(&self, object: ObjectKey, object_type: &'static str) {
        if let Some(published) = self.core.identity().published {
            warn!(object = %published, "init() on a published condition variable");
            self.unpublish();
        }
        self.core.abandon_waiters("init");
        self.core.set_identity(object, object_type);
    }

    /// Register under `object` so it can be found by key
    pub fn publish(&self, object: ObjectKey, object_type: &'static str) -> CondvarResult<()> {
        let result = system().registry().publish(object, &self.core, object_type);
        match &result {
            Ok(()) => debug!(
                variable = self.core.id(),
                object = %object,
                object_type,
                "Published condition variable"
            ),
            Err(e) => warn!(object = %object, error = %e, "Rejected condition variable publish"),
        }
        result
    }

    /// Remove the registry mapping; no-op for anonymous variables
    pub fn unpublish(&self) {
        if let Some(object) = system().registry().unpublish(&self.core) {
            debug!(variable = self.core.id(), object = %object, "Unpublished condition variable");
            self.core.abandon_waiters("unpublish");
        }
    }

    pub fn is_published(&self) -> bool {
        self.core.identity().published.is_some()
    }

    /// Wake the longest-waiting entry with `Ok`
    pub fn notify_one(&self) -> usize {
        self.core.notify(false, Ok(()))
    }

    /// Wake every attached entry with `Ok`, in attach order
    pub fn notify_all(&self) -> usize {
        self.core.notify(true, Ok(()))
    }

    pub fn notify_one_with(&self, result: WaitResult) -> usize {
        self.core.notify(false, result)
    }

    pub fn notify_all_with(&self, result: WaitResult) -> usize {
        self.core.notify(true, result)
    }

    /// Notify one waiter of the variable published under `object`
    ///
    /// Nothing published there means nobody is waiting: returns 0.
    pub fn notify_one_object(object: ObjectKey, result: WaitResult) -> usize {
        Self::notify_object(object, false, result)
    }

    /// Notify every waiter of the variable published under `object`
    pub fn notify_all_object(object: ObjectKey, result: WaitResult) -> usize {
        Self::notify_object(object, true, result)
    }

    fn notify_object(object: ObjectKey, all: bool, result: WaitResult) -> usize {
        let woken = system()
            .registry()
            .lookup_and_lock(object, |variable, entries| {
                variable.notify_locked(entries, all, &result)
            });
        match woken {
            Some(woken) => wake_waiters(woken, &result),
            None => {
                trace!(object = %object, "Notify on unpublished object");
                0
            }
        }
    }

    /// Attach `entry` on behalf of the calling thread
    pub fn add(&self, entry: &mut ConditionVariableEntry) {
        entry.prepare_attach();
        let thread = system().scheduler().current_thread();
        let waiter = {
            let mut entries = self.core.lock_entries();
            self.core.attach_locked(&mut entries, thread)
        };
        entry.attach(&self.core, waiter);
    }

    /// Lock-free count of attached entries; stale the moment it is read
    #[inline]
    pub fn entries_count(&self) -> usize {
        self.core.entries_count()
    }

    /// Attach a private entry and block on it
    pub fn wait(&self, flags: WaitFlags, timeout: Duration) -> WaitResult {
        let mut entry = ConditionVariableEntry::new();
        self.add(&mut entry);
        entry.wait(flags, timeout)
    }

    pub fn object(&self) -> ObjectKey {
        self.core.identity().object
    }

    pub fn object_type(&self) -> &'static str {
        self.core.identity().object_type
    }

    /// Shareable handle for notifying without owning the variable
    pub fn handle(&self) -> VariableRef {
        VariableRef {
            core: self.core.clone(),
        }
    }

    /// Diagnostic snapshot; never blocks
    pub fn dump(&self) -> VariableSnapshot {
        VariableSnapshot::capture(&self.core, system().config().dump_entry_limit)
    }

    /// Every published variable, lazily and without blocking
    pub fn list_all() -> RegistryCursor<'static> {
        let system = system();
        system.registry().cursor(system.config().dump_entry_limit)
    }

    /// Number of variables currently published
    pub fn published_count() -> usize {
        system().registry().len()
    }
}

impl Default for ConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConditionVariable {
    fn drop(&mut self) {
        if self.is_published() {
            self.unpublish();
        }
        if self.core.entries_count() > 0 {
            self.core.abandon_waiters("drop");
        }
    }
}

impl fmt::Debug for ConditionVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = self.core.try_identity();
        f.debug_struct("ConditionVariable")
            .field("id", &self.core.id())
            .field("object", &identity.map(|i| i.object))
            .field("object_type", &identity.map(|i| i.object_type))
            .field("entries", &self.core.entries_count())
            .finish()
    }
}

/// Non-owning handle to a variable
///
/// Keeps the variable's state alive but neither publishes nor unpublishes it.
#[derive(Clone)]
pub struct VariableRef {
    core: Arc<VariableCore>,
}

impl VariableRef {
    pub(crate) fn new(core: Arc<VariableCore>) -> Self {
        Self { core }
    }

    /// Whether this handle refers to `variable`
    pub fn is(&self, variable: &ConditionVariable) -> bool {
        Arc::ptr_eq(&self.core, &variable.core)
    }

    pub fn object(&self) -> ObjectKey {
        self.core.identity().object
    }

    pub fn object_type(&self) -> &'static str {
        self.core.identity().object_type
    }

    pub fn entries_count(&self) -> usize {
        self.core.entries_count()
    }

    pub fn notify_one_with(&self, result: WaitResult) -> usize {
        self.core.notify(false, result)
    }

    pub fn notify_all_with(&self, result: WaitResult) -> usize {
        self.core.notify(true, result)
    }
}

impl fmt::Debug for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableRef")
            .field("id", &self.core.id())
            .finish()
    }
}
