//! Scheduler: приоритеты + donation, либо MLFQS
//!
//! Один логический CPU. Состояние планировщика глобальное, под
//! spin-блокировкой, и трогается только с запрещёнными прерываниями.
//! Single logical CPU. Scheduler state is global, behind a spin lock,
//! and touched only with interrupts off.
//!
//! Политики / Policies:
//!   PriorityDonation:  приоритет задаёт поток, держатель блокировки
//!                      получает приоритет ждущих (транзитивно)
//!                      the thread sets its priority, a lock holder
//!                      inherits its waiters' priority (transitively)
//!   Mlfqs:             приоритет вычисляется из recent_cpu, nice, load_avg
//!                      priority derived from recent_cpu, nice, load_avg
//!
//! Порядок блокировок / Lock order:
//!   семафор / condvar → SCHEDULER. SCHEDULER не держится при переключении.
//!   semaphore / condvar → SCHEDULER. SCHEDULER is never held across a switch.

pub mod fixed_point;

mod donation;
mod lifecycle;
mod mlfqs;
mod policy;
mod scheduler;
mod thread;
mod tick;

use alloc::string::String;
use alloc::sync::Arc;
use log::info;
use spin::Mutex;

use crate::arch::interrupt::{intr_disable, intr_enable, intr_get_level, IntrGuard, IntrLevel};
use crate::arch::{machine, try_machine};
use crate::config::PRI_MIN;
use crate::error::Result;
use crate::kprintln;
use crate::sync::Semaphore;

pub use donation::{get_priority, set_priority};
pub use fixed_point::Fixed;
pub use lifecycle::{block, create, exit, sleep, thread_entry, unblock, yield_now};
pub use mlfqs::{get_load_avg, get_nice, get_recent_cpu, load_avg, set_nice};
pub use policy::Policy;
pub use thread::{Priority, ThreadInfo, ThreadStatus, Tid};
pub use tick::{tick, TickStats};

pub(crate) use donation::{
    begin_lock_wait, lock_acquired, lock_dropped, lock_held_by_current, lock_holder, lock_released,
};
pub(crate) use lifecycle::preempt;

use scheduler::Scheduler;

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

/// Критическая секция над состоянием планировщика.
/// Critical section over the scheduler state.
///
/// `f` не должна блокироваться, переключать потоки или снова звать `with`.
/// `f` must not block, switch threads or call `with` again.
pub(crate) fn with<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let _guard = IntrGuard::new();
    let mut sched = SCHEDULER.lock();
    match sched.as_mut() {
        Some(s) => f(s),
        None => panic!("sched: not initialized"),
    }
}

/// Как `with`, но `None`, пока нет машины или планировщика.
/// Like `with`, but `None` while there is no machine or scheduler yet.
pub(crate) fn try_with<R>(f: impl FnOnce(&mut Scheduler) -> R) -> Option<R> {
    try_machine()?;
    let _guard = IntrGuard::new();
    SCHEDULER.lock().as_mut().map(f)
}

/// Превратить текущий контекст в поток `main`.
/// Turn the running context into thread `main`.
///
/// Вызывается один раз, с запрещёнными прерываниями.
/// Called once, with interrupts off.
pub fn init(policy: Policy) -> Tid {
    assert!(
        intr_get_level() == IntrLevel::Off,
        "sched::init: interrupts must be off"
    );
    let s = Scheduler::new(policy);
    let main = s.current;
    *SCHEDULER.lock() = Some(s);
    info!("scheduler initialized ({:?})", policy);
    main
}

/// Создать idle поток и разрешить прерывания.
/// Create the idle thread and enable interrupts.
pub fn start() -> Result<()> {
    let started = Arc::new(Semaphore::new(0));
    let signal = Arc::clone(&started);
    create("idle", PRI_MIN, move || idle(signal))?;

    intr_enable();
    // ждём, пока idle запишет себя / wait until idle registers itself
    started.down();
    info!("scheduler started");
    Ok(())
}

/// Idle поток: выбирается, только когда готовых нет.
/// Idle thread: chosen only when nothing else is ready.
fn idle(started: Arc<Semaphore>) {
    with(|s| {
        s.idle = Some(s.current);
        let t = s.current_thread_mut();
        t.base_priority = PRI_MIN;
        t.priority = PRI_MIN;
    });
    started.up();

    loop {
        // hlt разрешает прерывания сам / hlt enables interrupts itself
        intr_disable();
        block();
        machine().wait_for_interrupt();
    }
}

// ── Запросы / Queries ────────────────────────────────────────────────────────

pub fn current() -> Tid {
    with(|s| s.current)
}

pub fn name() -> String {
    with(|s| String::from(s.current_thread().name()))
}

pub fn ticks() -> u64 {
    with(|s| s.ticks)
}

pub fn policy() -> Policy {
    with(|s| s.policy)
}

pub fn thread_info(tid: Tid) -> Option<ThreadInfo> {
    with(|s| s.threads.get(&tid).map(|t| t.info()))
}

/// Применить `action` к каждому потоку. Выполняется внутри критической
/// секции: `action` не должна звать планировщик.
/// Apply `action` to every thread. Runs inside the critical section:
/// `action` must not call back into the scheduler.
pub fn foreach(mut action: impl FnMut(&ThreadInfo)) {
    with(|s| {
        for t in s.threads.values() {
            action(&t.info());
        }
    });
}

pub fn sleeping_threads() -> usize {
    with(|s| s.sleepers.len())
}

/// Забрать запрос на уступку CPU, выставленный в прерывании.
/// Take the yield request raised inside an interrupt.
///
/// Зовётся обработчиком прерываний после выхода из контекста прерывания.
/// Called by the interrupt handler after leaving interrupt context.
pub fn take_yield_request() -> bool {
    with(|s| core::mem::take(&mut s.yield_on_return))
}

/// Индекс потока с наибольшим эффективным приоритетом (первый среди равных).
/// Index of the thread with the highest effective priority (first among equals).
pub(crate) fn highest_priority_index(tids: impl IntoIterator<Item = Tid>) -> Option<usize> {
    with(|s| s.highest_priority_of(tids))
}

pub fn stats() -> TickStats {
    with(|s| s.stats)
}

pub fn print_stats() {
    let stats = stats();
    kprintln!(
        "Thread: {} idle ticks, {} kernel ticks",
        stats.idle_ticks, stats.kernel_ticks
    );
}
