//! Тик таймера / Timer tick
//!
//! Вызывается обработчиком прерывания таймера, `TIMER_FREQ` раз в секунду.
//! Called by the timer interrupt handler, `TIMER_FREQ` times per second.
//!
//! Порядок за один тик / Order within one tick:
//!   1. счётчики тиков / tick counters
//!   2. пробуждение спящих / wake sleepers
//!   3. учёт MLFQS / MLFQS accounting
//!   4. квант и вытеснение / time slice and preemption

use crate::arch::interrupt::intr_context;
use crate::config::TIME_SLICE;

use super::scheduler::Scheduler;
use super::with;

/// Статистика тиков / Tick statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Тиков, проведённых в idle / Ticks spent in idle
    pub idle_ticks: u64,
    /// Тиков в остальных потоках / Ticks spent in other threads
    pub kernel_ticks: u64,
}

/// Точка входа из обработчика прерывания таймера.
/// Entry point from the timer interrupt handler.
///
/// Никогда не переключает потоки сама: если нужно, выставляет запрос,
/// который обработчик заберёт через `take_yield_request`.
/// Never switches threads itself: it raises a request that the handler
/// collects with `take_yield_request`.
pub fn tick() {
    assert!(intr_context(), "sched::tick: must run in the timer interrupt");
    with(|s| s.on_tick());
}

impl Scheduler {
    pub(crate) fn on_tick(&mut self) {
        self.ticks += 1;
        let idle = self.is_idle(self.current);
        if idle {
            self.stats.idle_ticks += 1;
        } else {
            self.stats.kernel_ticks += 1;
        }

        self.wake_sleepers();

        if self.policy.is_mlfqs() {
            self.mlfqs_tick();
        }

        self.slice_ticks += 1;
        if self.current_outranked() || (!idle && self.slice_ticks >= TIME_SLICE) {
            self.yield_on_return = true;
        }
    }

    /// Уменьшить счётчики; разбудить ровно на нуле.
    /// Count down; wake exactly at zero.
    fn wake_sleepers(&mut self) {
        let mut i = 0;
        while i < self.sleepers.len() {
            let tid = self.sleepers[i];
            let t = self.thread_mut(tid);
            t.sleep_ticks -= 1;
            if t.sleep_ticks <= 0 {
                t.sleep_ticks = 0;
                self.sleepers.remove(i);
                self.make_ready(tid);
            } else {
                i += 1;
            }
        }
    }
}
