//! Thread Control Block
//!
//! Каноническое состояние потока. Все поля меняются только под
//! блокировкой планировщика с запрещёнными прерываниями.
//! Canonical thread state. Fields change only under the scheduler lock
//! with interrupts off.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use crate::config::{NICE_DEFAULT, THREAD_MAGIC, THREAD_NAME_MAX};
use crate::sync::LockId;

use super::fixed_point::Fixed;

/// Идентификатор потока / Thread identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tid(pub u64);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Приоритет 0..=63 / Priority 0..=63
pub type Priority = i32;

/// Тело потока / Thread body
pub type ThreadFunc = Box<dyn FnOnce() + Send + 'static>;

/// Состояние потока / Thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Выполняется (ровно один) / Executing (exactly one)
    Running,
    /// В очереди готовых / On the ready set
    Ready,
    /// Ждёт unblock / Waiting for unblock
    Blocked,
    /// Завершён, будет убран следующим переключением / Finished, swept by the next switch
    Dying,
}

pub struct Thread {
    pub(crate) tid: Tid,
    pub(crate) name: String,
    pub(crate) status: ThreadStatus,

    // ── Приоритеты / Priorities ──────────────────────────────────────────
    pub(crate) base_priority: Priority,
    /// Эффективный, с учётом donation / Effective, donation included
    pub(crate) priority: Priority,
    /// Сколько потоков сейчас отдают нам приоритет / How many threads donate to us
    pub(crate) donation_count: usize,
    /// Отложенный set_priority / Deferred set_priority
    pub(crate) pending_priority: Option<Priority>,
    /// Ребро графа ожидания, не владение / Wait-graph edge, not ownership
    pub(crate) waiting_for: Option<LockId>,

    // ── MLFQS ────────────────────────────────────────────────────────────
    pub(crate) nice: i32,
    pub(crate) recent_cpu: Fixed,

    pub(crate) sleep_ticks: i64,
    pub(crate) entry: Option<ThreadFunc>,
    magic: u32,
}

impl Thread {
    pub(crate) fn new(tid: Tid, name: &str, priority: Priority, status: ThreadStatus) -> Self {
        Self {
            tid,
            name: name.chars().take(THREAD_NAME_MAX).collect(),
            status,
            base_priority: priority,
            priority,
            donation_count: 0,
            pending_priority: None,
            waiting_for: None,
            nice: NICE_DEFAULT,
            recent_cpu: Fixed::ZERO,
            sleep_ticks: 0,
            entry: None,
            magic: THREAD_MAGIC,
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn base_priority(&self) -> Priority {
        self.base_priority
    }

    /// Запись потока повреждена, ядру больше нельзя доверять.
    /// The record is corrupted; the kernel can no longer be trusted.
    pub(crate) fn check_magic(&self) {
        assert!(
            self.magic == THREAD_MAGIC,
            "thread {} ({}): bad magic {:#x}",
            self.tid, self.name, self.magic
        );
    }

    pub(crate) fn info(&self) -> ThreadInfo {
        ThreadInfo {
            tid: self.tid,
            name: self.name.clone(),
            status: self.status,
            base_priority: self.base_priority,
            priority: self.priority,
            donation_count: self.donation_count,
            nice: self.nice,
            recent_cpu: self.recent_cpu,
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("tid", &self.tid)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("priority", &self.priority)
            .field("base_priority", &self.base_priority)
            .field("donation_count", &self.donation_count)
            .finish_non_exhaustive()
    }
}

/// Снимок состояния потока / Snapshot of a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub tid: Tid,
    pub name: String,
    pub status: ThreadStatus,
    pub base_priority: Priority,
    pub priority: Priority,
    pub donation_count: usize,
    pub nice: i32,
    pub recent_cpu: Fixed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated() {
        let t = Thread::new(Tid(1), "a-very-long-thread-name", 31, ThreadStatus::Blocked);
        assert_eq!(t.name(), "a-very-long-thr");
        assert_eq!(t.priority(), t.base_priority());
        t.check_magic();
    }
}
