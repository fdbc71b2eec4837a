/*!
 * Condition Variable Race Tests
 *
 * Notify racing timeouts, drops, and other notifiers: every entry must be
 * detached exactly once and the waiter count must never drift.
 */

use kernel_condvar::{
    thread_scheduler, ConditionVariable, ConditionVariableEntry, ObjectKey, WaitError, WaitFlags,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_notify_races_timeout() {
    let cv = Arc::new(ConditionVariable::new());

    for round in 0..200u64 {
        let waiter = {
            let cv = cv.clone();
            thread::spawn(move || cv.wait(WaitFlags::RELATIVE_TIMEOUT, Duration::from_micros(500)))
        };

        let start = Instant::now();
        while cv.entries_count() == 0 && start.elapsed() < Duration::from_millis(50) {
            thread::yield_now();
        }
        thread::sleep(Duration::from_micros((round % 4) * 200));

        let woken = cv.notify_one();
        let result = waiter.join().unwrap();
        match woken {
            1 => assert_eq!(result, Ok(()), "round {}", round),
            0 => assert_eq!(result, Err(WaitError::TimedOut), "round {}", round),
            n => panic!("round {}: notify_one woke {}", round, n),
        }
        assert_eq!(cv.entries_count(), 0);
    }
}

#[test]
fn test_concurrent_notifiers_wake_each_waiter_once() {
    const WAITERS: usize = 16;
    const NOTIFIERS: usize = 4;

    let cv = Arc::new(ConditionVariable::new());
    let ok_results = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let (cv, ok_results) = (cv.clone(), ok_results.clone());
            thread::spawn(move || {
                if cv
                    .wait(WaitFlags::RELATIVE_TIMEOUT, Duration::from_millis(500))
                    .is_ok()
                {
                    ok_results.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    let start = Instant::now();
    while cv.entries_count() < WAITERS {
        assert!(start.elapsed() < Duration::from_secs(5));
        thread::yield_now();
    }

    let barrier = Arc::new(Barrier::new(NOTIFIERS));
    let notifiers: Vec<_> = (0..NOTIFIERS)
        .map(|_| {
            let (cv, barrier) = (cv.clone(), barrier.clone());
            thread::spawn(move || {
                barrier.wait();
                (0..WAITERS).map(|_| cv.notify_one()).sum::<usize>()
            })
        })
        .collect();

    let woken: usize = notifiers.into_iter().map(|h| h.join().unwrap()).sum();
    for waiter in waiters {
        waiter.join().unwrap();
    }

    assert_eq!(woken, WAITERS);
    assert_eq!(ok_results.load(Ordering::SeqCst), WAITERS);
    assert_eq!(cv.entries_count(), 0);
}

#[test]
fn test_notify_races_entry_drop() {
    let cv = Arc::new(ConditionVariable::new());

    for _ in 0..200 {
        let barrier = Arc::new(Barrier::new(2));
        let dropper = {
            let (cv, barrier) = (cv.clone(), barrier.clone());
            thread::spawn(move || {
                let mut entry = ConditionVariableEntry::new();
                cv.add(&mut entry);
                barrier.wait();
                drop(entry);
            })
        };

        barrier.wait();
        let woken = cv.notify_all();
        assert!(woken <= 1);
        dropper.join().unwrap();
        assert_eq!(cv.entries_count(), 0);
    }
}

#[test]
fn test_notify_by_key_races_unpublish() {
    for _ in 0..50 {
        let key = ObjectKey::of(Box::leak(Box::new(0u8)));
        let cv = Arc::new(ConditionVariable::new());
        cv.publish(key, "race").unwrap();

        let mut entry = ConditionVariableEntry::new();
        entry.add(key).unwrap();

        let notifier = thread::spawn(move || ConditionVariable::notify_all_object(key, Ok(())));
        cv.unpublish();
        let woken = notifier.join().unwrap();

        // Either the notify reached the entry first or the unpublish did
        let result = entry.wait(WaitFlags::empty(), Duration::ZERO);
        match woken {
            1 => assert_eq!(result, Ok(())),
            _ => assert_eq!(result, Err(WaitError::NotFound)),
        }
        assert_eq!(cv.entries_count(), 0);
        assert_eq!(ConditionVariable::notify_one_object(key, Ok(())), 0);
    }
}

#[test]
fn test_interrupts_never_end_plain_waits() {
    let cv = Arc::new(ConditionVariable::new());
    let (tx, rx) = mpsc::channel();

    let waiter = {
        let cv = cv.clone();
        thread::spawn(move || {
            tx.send(thread_scheduler().current_thread()).unwrap();
            let mut wrongly_interrupted = 0;
            for _ in 0..300 {
                let _ = cv.wait(
                    WaitFlags::CAN_INTERRUPT | WaitFlags::RELATIVE_TIMEOUT,
                    Duration::from_micros(20),
                );
                if cv.wait(WaitFlags::RELATIVE_TIMEOUT, Duration::from_micros(200))
                    == Err(WaitError::Interrupted)
                {
                    wrongly_interrupted += 1;
                }
            }
            wrongly_interrupted
        })
    };

    let target = rx.recv().unwrap();
    while !waiter.is_finished() {
        thread_scheduler().interrupt(target);
    }
    assert_eq!(waiter.join().unwrap(), 0);
    assert_eq!(cv.entries_count(), 0);
}
