//! Priority donation
//!
//! Граф ожидания: поток → блокировка, которую он ждёт → её держатель.
//! Эффективный приоритет держателя = max(свой базовый, эффективные
//! приоритеты всех, кто его ждёт, прямо или по цепочке).
//! Wait graph: thread → lock it waits for → that lock's holder.
//! A holder's effective priority = max(its base, the effective priority
//! of everyone waiting on it, directly or along a chain).
//!
//! Граф пересчитывается целиком при каждом изменении: начало ожидания,
//! захват, освобождение, смена приоритета. Отложенный `set_priority`
//! применяется в момент, когда donation_count падает до нуля.
//! The graph is recomputed on every change: wait start, acquire, release,
//! priority change. A deferred `set_priority` lands the moment
//! donation_count drops to zero.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use log::{debug, trace, warn};

use crate::sync::LockId;

use super::lifecycle::{check_priority, preempt};
use super::scheduler::Scheduler;
use super::thread::{Priority, Tid};
use super::{try_with, with};

impl Scheduler {
    /// Рёбра (ждущий, держатель) / Edges (waiter, holder)
    fn wait_edges(&self) -> Vec<(Tid, Tid)> {
        self.threads
            .values()
            .filter_map(|t| {
                let lock = t.waiting_for?;
                let holder = *self.holders.get(&lock)?;
                self.threads.contains_key(&holder).then_some((t.tid, holder))
            })
            .collect()
    }

    /// Пересчитать эффективные приоритеты и donation_count всех потоков.
    /// Recompute effective priorities and donation counts of all threads.
    pub(crate) fn refresh_donations(&mut self) {
        if !self.policy.donates() {
            return;
        }

        loop {
            let edges = self.wait_edges();

            let mut effective: BTreeMap<Tid, Priority> = self
                .threads
                .iter()
                .map(|(&tid, t)| (tid, t.base_priority))
                .collect();

            // поднимаем по рёбрам до неподвижной точки; циклы безопасны
            // raise along edges to a fixed point; cycles are safe
            let mut changed = true;
            while changed {
                changed = false;
                for &(waiter, holder) in &edges {
                    let p = effective[&waiter];
                    if let Some(h) = effective.get_mut(&holder) {
                        if p > *h {
                            *h = p;
                            changed = true;
                        }
                    }
                }
            }

            let tids: Vec<Tid> = self.threads.keys().copied().collect();
            for tid in tids {
                let base = self.thread(tid).base_priority;
                let donors = donors_of(tid, &edges)
                    .into_iter()
                    .filter(|w| effective[w] > base)
                    .count();
                let t = self.thread_mut(tid);
                t.priority = effective[&tid];
                t.donation_count = donors;
            }

            let mut deferred = false;
            for t in self.threads.values_mut() {
                if t.donation_count == 0 {
                    if let Some(p) = t.pending_priority.take() {
                        t.base_priority = p;
                        t.priority = p;
                        deferred = true;
                    }
                }
            }
            if !deferred {
                break;
            }
        }
    }
}

/// Все, кто ждёт `tid` прямо или по цепочке.
/// Everyone waiting on `tid`, directly or along a chain.
fn donors_of(tid: Tid, edges: &[(Tid, Tid)]) -> Vec<Tid> {
    let mut found: Vec<Tid> = Vec::new();
    let mut stack: Vec<Tid> = Vec::new();
    stack.push(tid);

    while let Some(holder) = stack.pop() {
        for &(waiter, h) in edges {
            if h == holder && waiter != tid && !found.contains(&waiter) {
                found.push(waiter);
                stack.push(waiter);
            }
        }
    }
    found
}

// ── Хуки блокировок / Lock hooks ─────────────────────────────────────────────

/// Текущий поток начинает ждать `lock`.
/// The running thread starts waiting for `lock`.
pub(crate) fn begin_lock_wait(lock: LockId) {
    with(|s| {
        let Some(&holder) = s.holders.get(&lock) else {
            return;
        };
        let cur = s.current;
        let priority = s.current_thread().priority;
        s.current_thread_mut().waiting_for = Some(lock);

        if s.policy.donates() && s.thread(holder).priority < priority {
            trace!("thread {} donates {} to {} via {}", cur, priority, holder, lock);
        }
        s.refresh_donations();
    });
}

/// Текущий поток захватил `lock`.
/// The running thread acquired `lock`.
pub(crate) fn lock_acquired(lock: LockId) {
    with(|s| {
        let cur = s.current;
        s.current_thread_mut().waiting_for = None;
        s.holders.insert(lock, cur);
        s.refresh_donations();
    });
}

/// Держатель отпускает `lock`; пожертвования через неё снимаются.
/// The holder lets go of `lock`; donations through it are withdrawn.
pub(crate) fn lock_released(lock: LockId) {
    with(|s| {
        s.holders.remove(&lock);
        s.refresh_donations();
    });
}

/// Блокировка уничтожена. Если её держали, запись о держателе убирается.
/// The lock is gone. If it was held, its holder record is removed.
pub(crate) fn lock_dropped(lock: LockId) {
    let held = try_with(|s| {
        let held = s.holders.remove(&lock).is_some();
        if held {
            s.refresh_donations();
        }
        held
    });
    if held == Some(true) {
        warn!("{} dropped while held", lock);
    }
}

pub(crate) fn lock_holder(lock: LockId) -> Option<Tid> {
    with(|s| s.holders.get(&lock).copied())
}

pub(crate) fn lock_held_by_current(lock: LockId) -> bool {
    with(|s| s.holders.get(&lock) == Some(&s.current))
}

// ── Приоритет / Priority ─────────────────────────────────────────────────────

/// Задать базовый приоритет текущего потока.
/// Set the running thread's base priority.
///
/// Пока потоку жертвуют приоритет, новое значение откладывается до
/// снятия последнего пожертвования. Под MLFQS ничего не делает.
/// While the thread receives donations the new value is deferred until
/// the last one is withdrawn. A no-op under MLFQS.
pub fn set_priority(new: Priority) {
    check_priority(new, "set_priority");

    let applied = with(|s| {
        if !s.policy.user_priority() {
            debug!("set_priority({}) ignored under {:?}", new, s.policy);
            return false;
        }
        let t = s.current_thread_mut();
        if t.donation_count > 0 {
            trace!("thread {}: priority {} deferred, {} donors", t.tid, new, t.donation_count);
            t.pending_priority = Some(new);
        } else {
            t.base_priority = new;
            t.priority = new;
            t.pending_priority = None;
        }
        s.refresh_donations();
        true
    });

    if applied {
        preempt();
    }
}

/// Эффективный приоритет текущего потока.
/// The running thread's effective priority.
pub fn get_priority() -> Priority {
    with(|s| s.current_thread().priority)
}
