//! MLFQS на hosted машине / MLFQS on the hosted machine

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::Journal;
use crate::arch::hosted::{self, boot};
use crate::config::{PRI_DEFAULT, PRI_MAX};
use crate::sched::{self, Fixed, Policy};
use crate::sync::Semaphore;

/// Два потока с заданными nice крутят таймер `duration` тиков.
/// Возвращает, сколько тиков досталось каждому.
/// Two threads with the given nice values drive the timer for `duration`
/// ticks. Returns how many ticks each of them got.
fn split_ticks(nices: [i32; 2], duration: u64) -> [usize; 2] {
    let end = sched::ticks() + duration;
    let done = Arc::new(Semaphore::new(0));
    let counters = [Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0))];

    for (nice, counter) in nices.into_iter().zip(&counters) {
        let (c, d) = (Arc::clone(counter), Arc::clone(&done));
        sched::create("spinner", PRI_DEFAULT, move || {
            sched::set_nice(nice);
            while sched::ticks() < end {
                hosted::tick();
                c.fetch_add(1, Ordering::SeqCst);
            }
            d.up();
        })
        .unwrap();
    }

    done.down();
    done.down();
    [counters[0].load(Ordering::SeqCst), counters[1].load(Ordering::SeqCst)]
}

#[test]
fn mlfqs_single_thread_three_seconds() {
    boot(Policy::Mlfqs, || {
        assert_eq!(sched::get_priority(), PRI_MAX);

        let mut seen = Vec::new();
        for _ in 0..3 {
            hosted::ticks(100);
            seen.push((
                sched::get_load_avg(),
                sched::get_recent_cpu(),
                sched::get_priority(),
            ));
        }
        assert_eq!(seen, [(2, 322, 62), (3, 639, 61), (5, 951, 61)]);
        assert_eq!(sched::load_avg().raw(), 804);
    });
}

#[test]
fn mlfqs_ignores_set_priority() {
    boot(Policy::Mlfqs, || {
        sched::set_priority(PRI_DEFAULT);
        assert_eq!(sched::get_priority(), PRI_MAX);
    });
}

#[test]
fn mlfqs_nice_lowers_priority_and_is_inherited() {
    boot(Policy::Mlfqs, || {
        sched::set_nice(5);
        assert_eq!(sched::get_nice(), 5);
        assert_eq!(sched::get_priority(), PRI_MAX - 10);

        let journal = Journal::new();
        let j = journal.clone();
        let child = sched::create("child", PRI_DEFAULT, move || {
            j.push(format!("nice {}", sched::get_nice()));
        })
        .unwrap();

        let info = sched::thread_info(child).unwrap();
        assert_eq!(info.nice, 5);
        assert_eq!(info.priority, PRI_MAX - 10);

        // main снова выше потомка / main outranks the child again
        sched::set_nice(-5);
        assert_eq!(sched::get_priority(), PRI_MAX);
        assert!(journal.entries().is_empty());

        sched::set_nice(20);
        assert_eq!(journal.entries(), ["nice 5"]);
    });
}

#[test]
fn mlfqs_priority_is_recomputed_every_fourth_tick() {
    boot(Policy::Mlfqs, || {
        hosted::ticks(3);
        assert_eq!(sched::get_priority(), PRI_MAX);
        hosted::tick();
        assert_eq!(sched::get_priority(), PRI_MAX - 1);
        assert_eq!(sched::get_recent_cpu(), 400);
    });
}

#[test]
fn mlfqs_large_recent_cpu_is_reported() {
    boot(Policy::Mlfqs, || {
        sched::with(|s| {
            s.current_thread_mut().recent_cpu = Fixed::from_raw(25_428_289);
            s.load_avg = Fixed::from_raw(665_014);
        });
        assert_eq!(sched::get_recent_cpu(), 155_202);
        assert_eq!(sched::get_load_avg(), 4_059);
    });
}

#[test]
fn mlfqs_load_avg_counts_waiting_threads() {
    boot(Policy::Mlfqs, || {
        // потомки наследуют nice 20 и всё время стоят в очереди
        // the children inherit nice 20 and sit in the ready queue throughout
        sched::set_nice(20);
        let children = [
            sched::create("low1", PRI_DEFAULT, || {}).unwrap(),
            sched::create("low2", PRI_DEFAULT, || {}).unwrap(),
        ];
        sched::set_nice(0);

        hosted::ticks(100);

        // main + 2 готовых / main + 2 ready: 3 * 273
        assert_eq!(sched::load_avg().raw(), 819);
        assert_eq!(sched::get_load_avg(), 5);
        assert_eq!(sched::get_recent_cpu(), 909);
        assert_eq!(sched::get_priority(), 61);

        for child in children {
            let info = sched::thread_info(child).unwrap();
            assert_eq!(info.recent_cpu, Fixed::from_int(20));
            assert_eq!(info.priority, 18);
        }
    });
}

#[test]
fn mlfqs_outranked_thread_yields_at_tick_boundary() {
    boot(Policy::Mlfqs, || {
        let journal = Journal::new();
        let j = journal.clone();
        sched::create("child", PRI_DEFAULT, move || {
            j.push(format!("child@{}", sched::ticks()));
        })
        .unwrap();

        for _ in 0..4 {
            journal.push(format!("main@{}", sched::ticks()));
            hosted::tick();
        }
        journal.push("main back");

        assert_eq!(
            journal.entries(),
            ["main@0", "main@1", "main@2", "main@3", "child@4", "main back"]
        );
    });
}

#[test]
fn mlfqs_equal_nice_shares_cpu_fairly() {
    boot(Policy::Mlfqs, || {
        let [a, b] = split_ticks([0, 0], 3000);
        assert_eq!(a + b, 3000);
        assert!(a.abs_diff(b) <= 50, "unfair split {} / {}", a, b);
    });
}

#[test]
fn mlfqs_nicer_thread_gets_less_cpu() {
    boot(Policy::Mlfqs, || {
        let [a, b] = split_ticks([0, 5], 3000);
        assert_eq!(a + b, 3000);
        assert!(a > b + 400, "nice 0 got {}, nice 5 got {}", a, b);
    });
}

#[test]
#[should_panic(expected = "out of range")]
fn nice_out_of_range_is_fatal() {
    boot(Policy::Mlfqs, || {
        sched::set_nice(21);
    });
}
