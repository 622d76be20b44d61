//! HAL: Hardware Abstraction Layer
//!
//! Ядро не знает, как устроены стеки, переключение регистров и таймер.
//! Всё это реализация `Machine`, которую платформа ставит при загрузке.
//! The kernel does not know how stacks, register switching or the timer work.
//! That is the `Machine` implementation the platform installs at boot.

pub mod interrupt;

#[cfg(any(test, feature = "hosted"))]
pub mod hosted;

use spin::RwLock;

use crate::error::Result;
use crate::sched::Tid;

/// Граница ядро ↔ железо / Kernel ↔ hardware boundary
///
/// Один логический CPU. Все методы вызываются только из кода ядра,
/// выполняющегося на этом CPU.
/// Single logical CPU. All methods are called only by kernel code
/// running on that CPU.
pub trait Machine: Sync {
    /// Разрешены ли прерывания / Are interrupts enabled
    fn interrupts_enabled(&self) -> bool;

    /// Разрешить или запретить прерывания / Enable or disable interrupts
    fn set_interrupts(&self, enabled: bool);

    /// Выполняемся ли мы внутри обработчика прерывания.
    /// Are we inside an interrupt handler.
    fn in_interrupt(&self) -> bool;

    /// Выделить контекст (стек) для потока `tid`. При первом переключении
    /// на него контекст вызывает `sched::thread_entry()`.
    /// Allocate an execution context (stack) for `tid`. When first switched
    /// to, the context calls `sched::thread_entry()`.
    fn spawn_context(&self, tid: Tid) -> Result<()>;

    /// Сохранить `from`, продолжить `to`. Возвращается, когда `from`
    /// снова выбран планировщиком.
    /// Save `from`, resume `to`. Returns once `from` is scheduled again.
    fn switch_context(&self, from: Tid, to: Tid);

    /// Уйти с умирающего потока навсегда.
    /// Leave a dying thread for good.
    fn exit_context(&self, from: Tid, to: Tid) -> !;

    /// Освободить контекст потока, снятого с учёта.
    /// Free the context of a swept thread.
    fn release_context(&self, tid: Tid);

    /// Разрешить прерывания и ждать следующего (hlt).
    /// Enable interrupts and halt until the next one (hlt).
    fn wait_for_interrupt(&self);

    /// Сырой вывод в консоль / Raw console output
    fn console_write(&self, s: &str);
}

static MACHINE: RwLock<Option<&'static dyn Machine>> = RwLock::new(None);

/// Установить машину. Первым делом при загрузке.
/// Install the machine. First thing at boot.
pub fn install(machine: &'static dyn Machine) {
    *MACHINE.write() = Some(machine);
}

/// Текущая машина; паника, если не установлена.
/// The installed machine; panics if none.
pub fn machine() -> &'static dyn Machine {
    match try_machine() {
        Some(m) => m,
        None => panic!("arch: no machine installed"),
    }
}

pub fn try_machine() -> Option<&'static dyn Machine> {
    *MACHINE.read()
}
