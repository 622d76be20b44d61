//! Сценарные тесты на hosted машине / Scenario tests on the hosted machine
//!
//! Каждый тест загружает ядро через `hosted::boot`, запускает потоки и
//! сравнивает записанный порядок событий с ожидаемым.
//! Each test boots the kernel with `hosted::boot`, runs threads and compares
//! the recorded order of events with the expected one.

mod mlfqs;
mod priority;

use std::sync::{Arc, Mutex};

/// Журнал событий, общий для потоков теста.
/// Event journal shared by the threads of a test.
#[derive(Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}
