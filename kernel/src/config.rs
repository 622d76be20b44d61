//! Конфигурация ядра / Kernel configuration
//!
//! Константы планировщика и разбор командной строки загрузки.
//! Scheduler constants and boot command line parsing.

use crate::error::{KernelError, Result};
use crate::sched::Policy;

// ── Приоритеты / Priorities ──────────────────────────────────────────────────

/// Низший приоритет / Lowest priority
pub const PRI_MIN: i32 = 0;
/// Приоритет по умолчанию / Default priority
pub const PRI_DEFAULT: i32 = 31;
/// Высший приоритет / Highest priority
pub const PRI_MAX: i32 = 63;

// ── MLFQS ────────────────────────────────────────────────────────────────────

pub const NICE_MIN: i32 = -20;
pub const NICE_DEFAULT: i32 = 0;
pub const NICE_MAX: i32 = 20;

/// Пересчёт приоритетов каждые N тиков / Recompute priorities every N ticks
pub const PRIORITY_INTERVAL: u64 = 4;

// ── Таймер / Timer ───────────────────────────────────────────────────────────

/// Тиков в секунду / Ticks per second
pub const TIMER_FREQ: u64 = 100;
/// Квант времени в тиках / Time slice in ticks
pub const TIME_SLICE: u32 = 4;

// ── Потоки / Threads ─────────────────────────────────────────────────────────

/// Максимальная длина имени потока / Max thread name length
pub const THREAD_NAME_MAX: usize = 15;
/// Метка живого потока / Liveness tag of a thread
pub const THREAD_MAGIC: u32 = 0xcd6a_bf4b;

/// Опции из командной строки загрузки / Options from the boot command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootOptions {
    pub policy: Policy,
}

impl BootOptions {
    /// Разобрать командную строку.
    /// Parse the command line.
    ///
    /// Понимаем только `-o mlfqs`; остальные опции принадлежат
    /// другим подсистемам и пропускаются.
    /// Only `-o mlfqs` is ours; other options belong elsewhere and are skipped.
    pub fn parse(cmdline: &str) -> Result<Self> {
        let mut opts = BootOptions::default();
        let mut words = cmdline.split_whitespace();

        while let Some(word) = words.next() {
            if word != "-o" {
                continue;
            }
            match words.next() {
                Some("mlfqs") => opts.policy = Policy::Mlfqs,
                Some(other) => {
                    log::warn!("unknown option -o {}", other);
                    return Err(KernelError::InvalidArg);
                }
                None => return Err(KernelError::InvalidArg),
            }
        }
        Ok(opts)
    }
}
