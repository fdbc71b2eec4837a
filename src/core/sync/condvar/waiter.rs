/*!
 * Waiter Record
 *
 * The part of a wait entry shared with the variable it is attached to. The
 * variable's entry list holds one reference, the owning entry the other.
 */

use crate::core::errors::{decode_wait_result, encode_wait_result, WaitResult};
use crate::scheduler::{ThreadId, WaitChannel};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const STILL_WAITING: u64 = 0;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub(crate) struct Waiter {
    /// Position in the variable's FIFO
    ticket: u64,
    thread: ThreadId,
    /// Encoded wait result, written once by whoever completes the wait
    status: AtomicU64,
}

impl Waiter {
    pub(crate) fn new(thread: ThreadId) -> Arc<Self> {
        Arc::new(Self {
            ticket: NEXT_TICKET.fetch_add(1, Ordering::Relaxed),
            thread,
            status: AtomicU64::new(STILL_WAITING),
        })
    }

    #[inline]
    pub(crate) fn ticket(&self) -> u64 {
        self.ticket
    }

    #[inline]
    pub(crate) fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Channel the owning thread blocks on
    #[inline]
    pub(crate) fn channel(&self) -> WaitChannel {
        WaitChannel::of(&self.status)
    }

    #[inline]
    pub(crate) fn is_waiting(&self) -> bool {
        self.status.load(Ordering::Acquire) == STILL_WAITING
    }

    /// Record the result; called with the variable's lock held
    #[inline]
    pub(crate) fn complete(&self, result: &WaitResult) {
        self.status
            .store(encode_wait_result(result), Ordering::Release);
    }

    pub(crate) fn result(&self) -> Option<WaitResult> {
        decode_wait_result(self.status.load(Ordering::Acquire))
    }
}
