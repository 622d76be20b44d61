//! Консоль / Console
//!
//! Форматированный вывод поверх `Machine::console_write`.
//! Formatted output on top of `Machine::console_write`.
//! До установки машины вывод молча теряется.
//! Output is dropped silently until a machine is installed.
//!
//! `CONSOLE_LOCK` берётся только с запрещёнными прерываниями.
//! `CONSOLE_LOCK` is only taken with interrupts off.

use core::fmt;
use spin::Mutex;

use crate::arch::{self, interrupt::IntrGuard};

// ── fmt::Write для использования с format_args! ───────────────────────────────

struct ConsoleWriter;

impl fmt::Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(machine) = arch::try_machine() {
            machine.console_write(s);
        }
        Ok(())
    }
}

static CONSOLE_LOCK: Mutex<ConsoleWriter> = Mutex::new(ConsoleWriter);

/// Внутренняя функция для макроса kprint!
/// Internal function for kprint! macro
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    let _guard = arch::try_machine().map(|_| IntrGuard::new());
    CONSOLE_LOCK.lock().write_fmt(args).ok();
}
