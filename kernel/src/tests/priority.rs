//! Планирование по приоритету / Priority scheduling

use std::sync::Arc;

use super::Journal;
use crate::arch::hosted::{self, boot};
use crate::config::{PRI_DEFAULT, PRI_MIN};
use crate::sched::{self, Policy};
use crate::sync::{Condvar, Lock, Semaphore};

#[test]
fn higher_priority_thread_preempts_creator() {
    boot(Policy::PriorityDonation, || {
        let journal = Journal::new();
        let j = journal.clone();
        sched::create("high", PRI_DEFAULT + 1, move || j.push("high")).unwrap();
        journal.push("main");

        assert_eq!(journal.entries(), ["high", "main"]);
    });
}

#[test]
fn priority_change_yields_to_better_thread() {
    boot(Policy::PriorityDonation, || {
        let journal = Journal::new();
        let j = journal.clone();
        sched::create("thread", PRI_DEFAULT + 1, move || {
            j.push("thread runs");
            sched::set_priority(PRI_DEFAULT - 1);
            j.push("thread again");
        })
        .unwrap();

        journal.push("main");
        sched::set_priority(PRI_DEFAULT - 2);
        journal.push("main end");

        assert_eq!(
            journal.entries(),
            ["thread runs", "main", "thread again", "main end"]
        );
        assert_eq!(sched::get_priority(), PRI_DEFAULT - 2);
    });
}

#[test]
fn yield_passes_to_equal_priority() {
    boot(Policy::PriorityDonation, || {
        let journal = Journal::new();
        let j = journal.clone();
        sched::create("other", PRI_DEFAULT, move || j.push("other")).unwrap();

        sched::yield_now();
        journal.push("main");
        assert_eq!(journal.entries(), ["other", "main"]);
    });
}

#[test]
fn equal_priorities_share_cpu_by_time_slice() {
    boot(Policy::PriorityDonation, || {
        let journal = Journal::new();
        let done = Arc::new(Semaphore::new(0));

        for name in ["a", "b"] {
            let j = journal.clone();
            let d = Arc::clone(&done);
            sched::create(name, PRI_DEFAULT, move || {
                for _ in 0..8 {
                    j.push(name);
                    hosted::tick();
                }
                d.up();
            })
            .unwrap();
        }

        done.down();
        done.down();
        assert_eq!(journal.entries().concat(), "aaaabbbbaaaabbbb");
    });
}

#[test]
fn semaphore_wakes_highest_priority_waiter() {
    boot(Policy::PriorityDonation, || {
        let journal = Journal::new();
        let sema = Arc::new(Semaphore::new(0));

        // приходят в порядке 3, 9, 6 / arrive in order 3, 9, 6
        for (priority, delay) in [(3, 1), (9, 2), (6, 3)] {
            let j = journal.clone();
            let s = Arc::clone(&sema);
            sched::create("waiter", priority, move || {
                sched::sleep(delay);
                s.down();
                j.push(format!("{}", priority));
            })
            .unwrap();
        }

        sched::sleep(10);
        sched::set_priority(PRI_MIN);
        for _ in 0..3 {
            sema.up();
        }
        assert_eq!(journal.entries(), ["9", "6", "3"]);
    });
}

#[test]
fn condvar_signals_highest_priority_waiter() {
    boot(Policy::PriorityDonation, || {
        let journal = Journal::new();
        let lock = Arc::new(Lock::new());
        let cond = Arc::new(Condvar::new());

        for (priority, delay) in [(3, 1), (9, 2), (6, 3)] {
            let j = journal.clone();
            let (l, c) = (Arc::clone(&lock), Arc::clone(&cond));
            sched::create("waiter", priority, move || {
                sched::sleep(delay);
                l.acquire();
                c.wait(&l);
                j.push(format!("{}", priority));
                l.release();
            })
            .unwrap();
        }

        sched::sleep(10);
        sched::set_priority(PRI_MIN);
        for _ in 0..3 {
            lock.acquire();
            cond.signal(&lock);
            lock.release();
        }
        assert_eq!(journal.entries(), ["9", "6", "3"]);
    });
}

#[test]
#[should_panic(expected = "out of range")]
fn set_priority_out_of_range_is_fatal() {
    boot(Policy::PriorityDonation, || {
        sched::set_priority(64);
    });
}

#[test]
#[should_panic(expected = "out of range")]
fn create_with_negative_priority_is_fatal() {
    boot(Policy::PriorityDonation, || {
        let _ = sched::create("bad", -1, || {});
    });
}
