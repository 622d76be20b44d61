//! Логгер ядра / Kernel logger
//!
//! Реализация `log::Log`, пишущая в консоль машины.
//! A `log::Log` implementation that writes to the machine console.
//!
//! Формат / Format: `[LEVEL] target: message`

use log::{LevelFilter, Metadata, Record};

use crate::kprintln;

static LOGGER: KernelLogger = KernelLogger;

struct KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            kprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Установить логгер.
/// Install the logger.
///
/// Повторный вызов только меняет уровень.
/// Calling it again only changes the level.
pub fn init(max_level: LevelFilter) {
    // Err означает, что логгер уже стоит / Err means it is already installed
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(max_level);
}
