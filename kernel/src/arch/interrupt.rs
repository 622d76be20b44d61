//! Уровень прерываний / Interrupt level
//!
//! Единственный механизм взаимного исключения в ядре.
//! The only mutual exclusion mechanism inside the kernel.

use super::machine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrLevel {
    Off,
    On,
}

pub fn intr_get_level() -> IntrLevel {
    if machine().interrupts_enabled() {
        IntrLevel::On
    } else {
        IntrLevel::Off
    }
}

/// Установить уровень, вернуть предыдущий.
/// Set the level, return the previous one.
pub fn intr_set_level(level: IntrLevel) -> IntrLevel {
    let old = intr_get_level();
    machine().set_interrupts(level == IntrLevel::On);
    old
}

pub fn intr_enable() -> IntrLevel {
    assert!(!intr_context(), "intr_enable: called from interrupt context");
    intr_set_level(IntrLevel::On)
}

pub fn intr_disable() -> IntrLevel {
    intr_set_level(IntrLevel::Off)
}

/// Внутри обработчика прерывания? / Inside an interrupt handler?
pub fn intr_context() -> bool {
    machine().in_interrupt()
}

/// Критическая секция: прерывания запрещены, пока жив guard.
/// Critical section: interrupts stay off while the guard lives.
///
/// При drop восстанавливается прежний уровень, в том числе при панике.
/// Drop restores the previous level, unwinding included.
#[must_use = "the critical section ends when the guard is dropped"]
pub struct IntrGuard {
    old: IntrLevel,
}

impl IntrGuard {
    pub fn new() -> Self {
        Self { old: intr_disable() }
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        intr_set_level(self.old);
    }
}
