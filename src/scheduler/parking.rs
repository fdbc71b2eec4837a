/*!
 * Parking Scheduler
 *
 * Hosted implementation of the scheduler interface on top of parking_lot_core.
 * On Linux, parking maps directly to futex syscalls.
 *
 * # Design
 *
 * Each blocked thread parks on the address of its wait record, so every
 * channel has at most one sleeper and `unpark_one` is an exact wakeup.
 * Per-thread records (pending interruption, current channel) live in a
 * sharded map keyed by thread id. A thread registers on first use and its
 * record is removed when the thread exits.
 */

use super::traits::ThreadScheduler;
use super::types::{ThreadId, WaitChannel, WakeReason};
use crate::core::errors::WaitResult;
use dashmap::DashMap;
use parking_lot::Mutex;
use parking_lot_core::{park, unpark_one, ParkResult, UnparkToken, DEFAULT_PARK_TOKEN};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::trace;

const NOTIFY_TOKEN: UnparkToken = UnparkToken(1);
const INTERRUPT_TOKEN: UnparkToken = UnparkToken(2);

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

type ThreadTable = DashMap<ThreadId, Arc<ThreadRecord>, ahash::RandomState>;

thread_local! {
    static CURRENT_THREAD: ThreadId =
        ThreadId::new(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
    static REGISTRATIONS: RefCell<Vec<Registration>> = const { RefCell::new(Vec::new()) };
}

/// Removes the owning thread's record from one scheduler when the thread exits
struct Registration {
    table: Weak<ThreadTable>,
    thread: ThreadId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.remove(&self.thread);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockedOn {
    channel: WaitChannel,
    interruptible: bool,
}

/// Scheduler-side state of one thread
#[derive(Default)]
struct ThreadRecord {
    interrupt_pending: AtomicBool,
    blocked_on: Mutex<Option<BlockedOn>>,
}

/// Scheduler backed by parking_lot_core's global parking table
pub struct ParkingScheduler {
    threads: Arc<ThreadTable>,
}

impl ParkingScheduler {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(DashMap::with_hasher(ahash::RandomState::new())),
        }
    }

    /// Record of the calling thread, registering it on first use
    fn current_record(&self) -> (ThreadId, Arc<ThreadRecord>) {
        let thread = CURRENT_THREAD.with(|id| *id);
        if let Some(record) = self.threads.get(&thread) {
            return (thread, record.value().clone());
        }

        let record = Arc::new(ThreadRecord::default());
        let registered = REGISTRATIONS.try_with(|registrations| {
            let mut registrations = registrations.borrow_mut();
            registrations.retain(|r| r.table.strong_count() > 0);
            registrations.push(Registration {
                table: Arc::downgrade(&self.threads),
                thread,
            });
        });
        // A thread already tearing down its locals gets an unshared record
        if registered.is_ok() {
            self.threads.insert(thread, record.clone());
        }
        (thread, record)
    }

    /// Number of live threads with a record
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Whether an interruption is waiting to be observed by `thread`
    pub fn has_pending_interrupt(&self, thread: ThreadId) -> bool {
        self.threads
            .get(&thread)
            .map(|record| record.interrupt_pending.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl Default for ParkingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadScheduler for ParkingScheduler {
    fn current_thread(&self) -> ThreadId {
        self.current_record().0
    }

    fn block_current_thread(
        &self,
        channel: WaitChannel,
        deadline: Option<Instant>,
        interruptible: bool,
        still_waiting: &dyn Fn() -> bool,
    ) -> WakeReason {
        let (thread, record) = self.current_record();

        if interruptible && record.interrupt_pending.swap(false, Ordering::SeqCst) {
            return WakeReason::Interrupted;
        }

        // Publish the channel before the validate check so a concurrent
        // interrupt either sees it or is seen by validate.
        *record.blocked_on.lock() = Some(BlockedOn {
            channel,
            interruptible,
        });

        trace!(thread = %thread, channel = channel.addr(), "blocking");

        // SAFETY: the validate callback performs atomic loads only and the
        // other callbacks are empty, so none of them panic or re-enter the
        // parking table.
        let result = unsafe {
            park(
                channel.addr(),
                || {
                    still_waiting()
                        && !(interruptible && record.interrupt_pending.load(Ordering::SeqCst))
                },
                || {},
                |_, _| {},
                DEFAULT_PARK_TOKEN,
                deadline,
            )
        };

        *record.blocked_on.lock() = None;

        match result {
            ParkResult::Unparked(token) if token == INTERRUPT_TOKEN => {
                record.interrupt_pending.store(false, Ordering::SeqCst);
                WakeReason::Interrupted
            }
            ParkResult::Unparked(_) => WakeReason::Notified,
            ParkResult::TimedOut => WakeReason::TimedOut,
            ParkResult::Invalid => {
                if interruptible && record.interrupt_pending.swap(false, Ordering::SeqCst) {
                    WakeReason::Interrupted
                } else {
                    WakeReason::NotBlocked
                }
            }
        }
    }

    fn wake_thread(&self, thread: ThreadId, channel: WaitChannel, result: &WaitResult) -> bool {
        // SAFETY: the callback only returns a token.
        let unparked = unsafe { unpark_one(channel.addr(), |_| NOTIFY_TOKEN) };
        trace!(
            thread = %thread,
            channel = channel.addr(),
            ?result,
            unparked = unparked.unparked_threads,
            "wake"
        );
        unparked.unparked_threads > 0
    }

    fn interrupt(&self, thread: ThreadId) -> bool {
        let Some(record) = self.threads.get(&thread).map(|r| r.value().clone()) else {
            trace!(thread = %thread, "interrupt for unknown thread");
            return false;
        };
        record.interrupt_pending.store(true, Ordering::SeqCst);

        // Held across the unpark: the target cannot leave this park and
        // reuse the channel for a wait the interruption does not apply to.
        let blocked_on = record.blocked_on.lock();
        match *blocked_on {
            Some(blocked) if blocked.interruptible => {
                // SAFETY: the callback only returns a token.
                let unparked = unsafe { unpark_one(blocked.channel.addr(), |_| INTERRUPT_TOKEN) };
                trace!(thread = %thread, unparked = unparked.unparked_threads, "interrupt");
                unparked.unparked_threads > 0
            }
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        "parking"
    }
}
