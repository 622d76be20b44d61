//! Блокировка с владельцем / Lock with an owner
//!
//! Семафор(1) + владелец. Отпускает только владелец.
//! Semaphore(1) + owner. Only the owner may release it.
//!
//! Владелец хранится в планировщике (граф donation), а не здесь.
//! The owner is kept by the scheduler (donation graph), not here.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::arch::interrupt::{intr_context, IntrGuard};
use crate::sched::{self, Tid};

use super::Semaphore;

/// Идентификатор блокировки, ключ в графе ожидания.
/// Lock identifier, a key into the wait graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockId(u64);

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

impl LockId {
    pub(crate) fn next() -> Self {
        LockId(NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

pub struct Lock {
    id: LockId,
    sema: Semaphore,
}

impl Lock {
    pub fn new() -> Self {
        Self {
            id: LockId::next(),
            sema: Semaphore::new(1),
        }
    }

    pub fn id(&self) -> LockId {
        self.id
    }

    /// Захватить, при необходимости ожидая. Пока ждём, наш приоритет
    /// передаётся держателю и дальше по цепочке.
    /// Acquire, waiting if needed. While we wait our priority is donated
    /// to the holder and on along the chain.
    pub fn acquire(&self) {
        assert!(!intr_context(), "lock_acquire: called from interrupt context");
        assert!(
            !self.held_by_current_thread(),
            "lock_acquire: {} already held by the current thread",
            self.id
        );

        let _guard = IntrGuard::new();
        sched::begin_lock_wait(self.id);
        self.sema.down();
        sched::lock_acquired(self.id);
    }

    /// Не блокируется и не передаёт приоритет.
    /// Never blocks and never donates.
    pub fn try_acquire(&self) -> bool {
        assert!(
            !self.held_by_current_thread(),
            "lock_try_acquire: {} already held by the current thread",
            self.id
        );

        let _guard = IntrGuard::new();
        let acquired = self.sema.try_down();
        if acquired {
            sched::lock_acquired(self.id);
        }
        acquired
    }

    pub fn release(&self) {
        assert!(
            self.held_by_current_thread(),
            "lock_release: {} not held by the current thread",
            self.id
        );

        let _guard = IntrGuard::new();
        sched::lock_released(self.id);
        self.sema.up();
    }

    pub fn held_by_current_thread(&self) -> bool {
        sched::lock_held_by_current(self.id)
    }

    pub fn holder(&self) -> Option<Tid> {
        sched::lock_holder(self.id)
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        sched::lock_dropped(self.id);
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}
