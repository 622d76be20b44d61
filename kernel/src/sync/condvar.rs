//! Условная переменная (Mesa) / Condition variable (Mesa)
//!
//! Сигнал будит ждущего, но не передаёт ему блокировку: проснувшись,
//! поток обязан перепроверить условие.
//! A signal wakes a waiter without handing it the lock: after waking
//! the thread must re-check its condition.

use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::arch::interrupt::{intr_context, IntrGuard};
use crate::sched::{self, Tid};

use super::{Lock, Semaphore};

/// Ждущий со своим одноразовым семафором / A waiter with its one-shot semaphore
struct Waiter {
    tid: Tid,
    sema: Arc<Semaphore>,
}

pub struct Condvar {
    waiters: Mutex<Vec<Waiter>>,
}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Отпустить `lock`, ждать сигнала, снова захватить `lock`.
    /// Release `lock`, wait for a signal, reacquire `lock`.
    pub fn wait(&self, lock: &Lock) {
        assert!(!intr_context(), "cond_wait: called from interrupt context");
        assert!(
            lock.held_by_current_thread(),
            "cond_wait: {} not held by the current thread",
            lock.id()
        );

        let sema = Arc::new(Semaphore::new(0));
        {
            let _guard = IntrGuard::new();
            self.waiters.lock().push(Waiter {
                tid: sched::current(),
                sema: Arc::clone(&sema),
            });
        }

        lock.release();
        sema.down();
        lock.acquire();
    }

    /// Разбудить самого приоритетного ждущего, если есть.
    /// Wake the highest-priority waiter, if any.
    pub fn signal(&self, lock: &Lock) {
        assert!(
            lock.held_by_current_thread(),
            "cond_signal: {} not held by the current thread",
            lock.id()
        );

        let waiter = {
            let _guard = IntrGuard::new();
            let mut waiters = self.waiters.lock();
            let best = sched::highest_priority_index(waiters.iter().map(|w| w.tid));
            best.map(|i| waiters.remove(i))
        };

        if let Some(w) = waiter {
            w.sema.up();
        }
    }

    /// Разбудить всех / Wake everyone
    pub fn broadcast(&self, lock: &Lock) {
        while self.has_waiters() {
            self.signal(lock);
        }
    }

    fn has_waiters(&self) -> bool {
        let _guard = IntrGuard::new();
        !self.waiters.lock().is_empty()
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
