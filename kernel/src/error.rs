//! Ошибки ядра / Kernel errors
//!
//! Нарушения инвариантов дают `panic!`, а не ошибки.
//! Invariant violations are `panic!`, not errors.

use core::fmt;

/// Восстановимые ошибки / Recoverable errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Не удалось выделить контекст потока / Could not allocate a thread context
    NoMemory,
    /// Неверный аргумент (опция загрузки) / Invalid argument (boot option)
    InvalidArg,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::NoMemory   => f.write_str("out of memory"),
            KernelError::InvalidArg => f.write_str("invalid argument"),
        }
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;
