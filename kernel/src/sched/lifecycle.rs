//! Жизненный цикл потока и переключение / Thread lifecycle and switching
//!
//! ```text
//!   create ──► Ready ◄──── unblock ──── Blocked
//!               │  ▲                       ▲
//!      schedule │  │ yield / preempt       │ block / sleep
//!               ▼  │                       │
//!              Running ────────────────────┘
//!               │
//!          exit ▼
//!              Dying ──► убран следующим schedule_tail / swept by the next schedule_tail
//! ```

use alloc::boxed::Box;
use log::{debug, trace, warn};

use crate::arch::interrupt::{intr_context, intr_disable, intr_enable, intr_get_level, IntrGuard, IntrLevel};
use crate::arch::machine;
use crate::config::{PRI_MAX, PRI_MIN};
use crate::error::Result;

use super::thread::{Priority, ThreadStatus, Tid};
use super::with;

pub(crate) fn check_priority(priority: Priority, op: &str) {
    assert!(
        (PRI_MIN..=PRI_MAX).contains(&priority),
        "{}: priority {} out of range [{}, {}]",
        op, priority, PRI_MIN, PRI_MAX
    );
}

/// Создать поток и поставить его в очередь готовых.
/// Create a thread and put it on the ready set.
///
/// Если новый поток важнее текущего, текущий уступает CPU сразу.
/// If the new thread outranks the caller, the caller yields at once.
///
/// Ошибка только если машина не смогла выделить контекст.
/// Fails only when the machine cannot allocate a context.
pub fn create<F>(name: &str, priority: Priority, f: F) -> Result<Tid>
where
    F: FnOnce() + Send + 'static,
{
    check_priority(priority, "create");

    let tid = with(|s| s.register(name, priority, Box::new(f)));
    if let Err(e) = machine().spawn_context(tid) {
        with(|s| {
            s.threads.remove(&tid);
        });
        warn!("create {}: {}", name, e);
        return Err(e);
    }

    debug!("created thread {} ({}) at priority {}", tid, name, priority);
    unblock(tid);
    preempt();
    Ok(tid)
}

/// Первое, что выполняет новый контекст.
/// The first thing a fresh context runs.
pub fn thread_entry() -> ! {
    schedule_tail();
    intr_enable();

    let entry = with(|s| s.current_thread_mut().entry.take());
    if let Some(f) = entry {
        f();
    }
    exit()
}

/// Running → Blocked, переключиться на другой поток.
/// Running → Blocked, switch to another thread.
///
/// Поток должен уже стоять в чьём-то списке ожидания.
/// The thread must already be on some wait list.
pub fn block() {
    assert!(!intr_context(), "block: called from interrupt context");
    assert!(
        intr_get_level() == IntrLevel::Off,
        "block: interrupts must be off"
    );

    with(|s| {
        let t = s.current_thread_mut();
        assert!(
            t.status == ThreadStatus::Running,
            "block: thread {} ({}) is {:?}, not running",
            t.tid, t.name, t.status
        );
        t.status = ThreadStatus::Blocked;
    });
    schedule();
}

/// Blocked → Ready. Не вытесняет вызывающего; можно звать из прерывания.
/// Blocked → Ready. Does not preempt the caller; safe in interrupt context.
pub fn unblock(tid: Tid) {
    with(|s| s.make_ready(tid));
}

/// Уступить CPU. Текущий поток остаётся готовым.
/// Give up the CPU. The running thread stays ready.
pub fn yield_now() {
    assert!(!intr_context(), "yield: called from interrupt context");
    let _guard = IntrGuard::new();

    with(|s| {
        let cur = s.current;
        if s.is_idle(cur) {
            // idle никогда не стоит в очереди готовых
            s.current_thread_mut().status = ThreadStatus::Blocked;
        } else {
            s.current_thread_mut().status = ThreadStatus::Ready;
            s.ready.push_back(cur);
        }
    });
    schedule();
}

/// Уступить CPU, если есть готовый поток важнее текущего.
/// Yield if a ready thread outranks the running one.
///
/// В контексте прерывания только выставляет запрос на уступку.
/// In interrupt context it only raises the yield request.
pub(crate) fn preempt() {
    let in_interrupt = intr_context();
    let must_yield = with(|s| {
        if !s.current_outranked() {
            return false;
        }
        if in_interrupt {
            s.yield_on_return = true;
            return false;
        }
        true
    });
    if must_yield {
        yield_now();
    }
}

/// Заснуть на `ticks` тиков таймера. При `ticks <= 0` ничего не делает.
/// Sleep for `ticks` timer ticks. `ticks <= 0` does nothing.
pub fn sleep(ticks: i64) {
    if ticks <= 0 {
        return;
    }
    assert!(!intr_context(), "sleep: called from interrupt context");

    let _guard = IntrGuard::new();
    with(|s| {
        let cur = s.current;
        s.current_thread_mut().sleep_ticks = ticks;
        s.sleepers.push(cur);
        trace!("thread {} sleeps for {} ticks", cur, ticks);
    });
    block();
}

/// Завершить текущий поток. Запись убирает следующий поток в `schedule_tail`.
/// Finish the running thread. The next thread sweeps the record in `schedule_tail`.
pub fn exit() -> ! {
    assert!(!intr_context(), "exit: called from interrupt context");
    intr_disable();

    let tid = with(|s| {
        let t = s.current_thread_mut();
        t.status = ThreadStatus::Dying;
        t.tid
    });
    debug!("thread {} exiting", tid);
    schedule();
    unreachable!("sched: dying thread {} was scheduled again", tid)
}

// ── Переключение / Switching ─────────────────────────────────────────────────

/// Выбрать следующий поток и переключиться на него.
/// Pick the next thread and switch to it.
///
/// Прерывания запрещены, текущий поток уже не Running.
/// Interrupts are off, the running thread is no longer Running.
fn schedule() {
    assert!(
        intr_get_level() == IntrLevel::Off,
        "schedule: interrupts must be off"
    );

    let (cur, next, dying) = with(|s| {
        let cur = s.current;
        let status = s.thread(cur).status;
        assert!(
            status != ThreadStatus::Running,
            "schedule: thread {} is still running",
            cur
        );

        let next = s.next_thread_to_run();
        s.thread(next).check_magic();
        s.prev = Some(cur);
        s.current = next;
        (cur, next, status == ThreadStatus::Dying)
    });

    if cur != next {
        trace!("switch {} -> {}", cur, next);
        if dying {
            machine().exit_context(cur, next);
        }
        machine().switch_context(cur, next);
    }
    schedule_tail();
}

/// Завершить переключение на новом потоке: отметить его Running и
/// убрать предыдущий, если тот умер.
/// Finish a switch on the new thread: mark it Running and sweep the
/// previous one if it died.
fn schedule_tail() {
    let swept = with(|s| {
        let cur = s.current;
        s.current_thread_mut().status = ThreadStatus::Running;
        s.slice_ticks = 0;

        match s.prev.take() {
            Some(prev) if prev != cur && s.thread(prev).status == ThreadStatus::Dying => {
                s.threads.remove(&prev);
                Some(prev)
            }
            _ => None,
        }
    });

    if let Some(tid) = swept {
        debug!("thread {} reaped", tid);
        machine().release_context(tid);
    }
}
