//! MLFQS: Multilevel Feedback Queue Scheduler (4.4BSD)
//!
//! Приоритет не задаётся, а вычисляется / Priority is derived, not set:
//!
//! ```text
//!   priority   = PRI_MAX - recent_cpu / 4 - nice * 2        каждые 4 тика / every 4 ticks
//!   load_avg   = 59/60 * load_avg + 1/60 * ready_threads    раз в секунду / once a second
//!   recent_cpu = 2*load_avg / (2*load_avg + 1) * recent_cpu + nice
//!   recent_cpu += 1 для текущего потока каждый тик / for the running thread every tick
//! ```
//!
//! Всё в fixed-point 17.14; к целому округлением.
//! All in 17.14 fixed point; converted to integers by rounding.
//! Idle поток в учёте не участвует / The idle thread takes no part.

use log::debug;

use crate::config::{NICE_MAX, NICE_MIN, PRIORITY_INTERVAL, PRI_MAX, PRI_MIN, TIMER_FREQ};

use super::fixed_point::Fixed;
use super::lifecycle::preempt;
use super::scheduler::Scheduler;
use super::thread::Priority;
use super::with;

pub(crate) fn priority_for(recent_cpu: Fixed, nice: i32) -> Priority {
    let p = Fixed::from_int(PRI_MAX) - recent_cpu.div_int(4) - Fixed::from_int(nice * 2);
    p.round().clamp(PRI_MIN, PRI_MAX)
}

pub(crate) fn next_load_avg(load_avg: Fixed, ready_threads: usize) -> Fixed {
    let decay = Fixed::from_int(59) / Fixed::from_int(60);
    let share = Fixed::from_int(1) / Fixed::from_int(60);
    decay * load_avg + share.mul_int(ready_threads as i32)
}

pub(crate) fn decay_recent_cpu(recent_cpu: Fixed, load_avg: Fixed, nice: i32) -> Fixed {
    let twice = load_avg.mul_int(2);
    let coeff = twice / twice.add_int(1);
    coeff * recent_cpu + Fixed::from_int(nice)
}

impl Scheduler {
    pub(crate) fn mlfqs_tick(&mut self) {
        let cur = self.current;
        if !self.is_idle(cur) {
            let t = self.thread_mut(cur);
            t.recent_cpu = t.recent_cpu.add_int(1);
        }

        if self.ticks % TIMER_FREQ == 0 {
            self.load_avg = next_load_avg(self.load_avg, self.ready_threads());
            let load_avg = self.load_avg;
            let idle = self.idle;
            for t in self.threads.values_mut().filter(|t| Some(t.tid) != idle) {
                t.recent_cpu = decay_recent_cpu(t.recent_cpu, load_avg, t.nice);
            }
        }

        if self.ticks % PRIORITY_INTERVAL == 0 {
            self.refresh_mlfqs_priorities();
        }
    }

    fn refresh_mlfqs_priorities(&mut self) {
        let idle = self.idle;
        for t in self.threads.values_mut().filter(|t| Some(t.tid) != idle) {
            let p = priority_for(t.recent_cpu, t.nice);
            t.base_priority = p;
            t.priority = p;
        }
    }
}

// ── Аксессоры / Accessors ────────────────────────────────────────────────────

pub fn set_nice(nice: i32) {
    assert!(
        (NICE_MIN..=NICE_MAX).contains(&nice),
        "set_nice: nice {} out of range [{}, {}]",
        nice, NICE_MIN, NICE_MAX
    );

    with(|s| {
        let mlfqs = s.policy.is_mlfqs();
        let t = s.current_thread_mut();
        t.nice = nice;
        if mlfqs {
            let p = priority_for(t.recent_cpu, nice);
            t.base_priority = p;
            t.priority = p;
            debug!("thread {}: nice {} -> priority {}", t.tid, nice, p);
        }
    });
    preempt();
}

pub fn get_nice() -> i32 {
    with(|s| s.current_thread().nice)
}

/// recent_cpu текущего потока × 100, округлённый.
/// Running thread's recent_cpu × 100, rounded.
pub fn get_recent_cpu() -> i32 {
    with(|s| s.current_thread().recent_cpu.round_scaled(100))
}

/// load_avg × 100, округлённый / load_avg × 100, rounded
pub fn get_load_avg() -> i32 {
    with(|s| s.load_avg.round_scaled(100))
}

pub fn load_avg() -> Fixed {
    with(|s| s.load_avg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::{Policy, ThreadStatus};

    #[test]
    fn priority_formula_clamps() {
        assert_eq!(priority_for(Fixed::ZERO, 0), PRI_MAX);
        assert_eq!(priority_for(Fixed::from_int(4), 0), 62);
        assert_eq!(priority_for(Fixed::ZERO, 20), 23);
        assert_eq!(priority_for(Fixed::from_int(400), 20), PRI_MIN);
        assert_eq!(priority_for(Fixed::ZERO, -20), PRI_MAX);
    }

    #[test]
    fn load_avg_after_one_second() {
        let load = next_load_avg(Fixed::ZERO, 1);
        assert_eq!(load.raw(), 273);
        assert_eq!(load.round_scaled(100), 2);
    }

    #[test]
    fn recent_cpu_decay() {
        let load = Fixed::from_raw(273);
        let recent = decay_recent_cpu(Fixed::from_int(100), load, 0);
        assert_eq!(recent.raw(), 52_800);
        assert_eq!(recent.round_scaled(100), 322);
    }

    #[test]
    fn one_running_thread_for_three_seconds() {
        let mut s = Scheduler::new(Policy::Mlfqs);
        let mut seen = Vec::new();
        for _ in 0..3 {
            for _ in 0..TIMER_FREQ {
                s.ticks += 1;
                s.mlfqs_tick();
            }
            let t = s.current_thread();
            seen.push((
                s.load_avg.raw(),
                t.recent_cpu.raw(),
                s.load_avg.round_scaled(100),
                t.recent_cpu.round_scaled(100),
                t.priority(),
            ));
        }

        assert_eq!(
            seen,
            vec![
                (273, 52_800, 2, 322, 62),
                (541, 104_667, 3, 639, 61),
                (804, 155_752, 5, 951, 61),
            ]
        );
    }

    #[test]
    fn load_avg_counts_ready_threads() {
        let mut s = Scheduler::new(Policy::Mlfqs);
        for name in ["a", "b"] {
            let tid = s.register(name, PRI_MAX, Box::new(|| {}));
            s.make_ready(tid);
        }
        assert_eq!(s.ready_threads(), 3);

        for _ in 0..TIMER_FREQ {
            s.ticks += 1;
            s.mlfqs_tick();
        }
        assert_eq!(s.load_avg.raw(), 3 * 273);
        assert_eq!(s.load_avg.round_scaled(100), 5);
    }

    #[test]
    fn idle_takes_no_part_in_accounting() {
        let mut s = Scheduler::new(Policy::Mlfqs);
        let idle = s.register("idle", PRI_MIN, Box::new(|| {}));
        s.idle = Some(idle);
        let main = s.current;
        s.thread_mut(main).status = ThreadStatus::Blocked;
        s.current = idle;
        let t = s.thread_mut(idle);
        t.status = ThreadStatus::Running;
        t.base_priority = PRI_MIN;
        t.priority = PRI_MIN;

        for _ in 0..TIMER_FREQ {
            s.ticks += 1;
            s.mlfqs_tick();
        }
        assert_eq!(s.ready_threads(), 0);
        assert_eq!(s.load_avg, Fixed::ZERO);
        assert_eq!(s.thread(idle).recent_cpu, Fixed::ZERO);
        assert_eq!(s.thread(idle).priority(), PRI_MIN);
    }

    #[test]
    fn recompute_alone_requests_a_yield() {
        let mut s = Scheduler::new(Policy::Mlfqs);
        let other = s.register("other", PRI_MAX, Box::new(|| {}));
        s.make_ready(other);

        for _ in 0..3 {
            s.on_tick();
            assert!(!s.yield_on_return);
        }
        // квант не истёк: уступку вызывает только пересчёт
        // the slice has not run out: only the recompute asks for the yield
        s.slice_ticks = 0;
        s.on_tick();

        assert!(s.yield_on_return);
        assert_eq!(s.current_thread().priority(), PRI_MAX - 1);
        assert_eq!(s.thread(other).priority(), PRI_MAX);
    }

    #[test]
    fn blocked_threads_decay_too() {
        let mut s = Scheduler::new(Policy::Mlfqs);
        let sleeper = s.register("sleeper", PRI_MAX, Box::new(|| {}));
        s.thread_mut(sleeper).recent_cpu = Fixed::from_int(100);

        s.ticks = TIMER_FREQ;
        s.mlfqs_tick();

        let t = s.thread(sleeper);
        assert_eq!(t.status(), ThreadStatus::Blocked);
        assert_eq!(t.recent_cpu.raw(), 52_800);
        assert_eq!(t.priority(), 62);
    }
}
