//! Cinder Kernel: ядро потоков и синхронизации / threading and synchronization core
//!
//! Планировщик с приоритетами и передачей приоритета (donation),
//! альтернативный MLFQS, семафоры, блокировки и условные переменные.
//! Priority scheduler with transitive donation, an alternative MLFQS,
//! semaphores, locks and condition variables.
//!
//! Порядок запуска / Boot order:
//!   arch::install(machine)   // граница с железом / hardware boundary
//!   logger::init(level)
//!   sched::init(policy)      // текущий контекст становится "main"
//!   sched::start()           // idle поток + прерывания / idle thread + interrupts

#![cfg_attr(not(any(test, feature = "hosted")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

// Box, VecDeque, BTreeMap, Arc
extern crate alloc;

pub mod arch;
pub mod config;
pub mod drivers;
pub mod error;
pub mod logger;
pub mod sched;
pub mod sync;

#[cfg(test)]
mod tests;

pub use error::{KernelError, Result};
