//! Семафор со счётчиком / Counting semaphore

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use log::info;
use spin::Mutex;

use crate::arch::interrupt::{intr_context, IntrGuard};
use crate::config::PRI_DEFAULT;
use crate::error::Result;
use crate::sched::{self, Tid};

struct SemaState {
    value: u32,
    waiters: VecDeque<Tid>,
}

pub struct Semaphore {
    state: Mutex<SemaState>,
}

impl Semaphore {
    pub const fn new(value: u32) -> Self {
        Self {
            state: Mutex::new(SemaState {
                value,
                waiters: VecDeque::new(),
            }),
        }
    }

    /// P: ждать, пока счётчик не станет положительным, и уменьшить его.
    /// P: wait until the count is positive, then decrement it.
    pub fn down(&self) {
        assert!(!intr_context(), "sema_down: called from interrupt context");
        let _guard = IntrGuard::new();

        loop {
            {
                let mut st = self.state.lock();
                if st.value > 0 {
                    st.value -= 1;
                    return;
                }
                st.waiters.push_back(sched::current());
            }
            // разбуженный поток перепроверяет счётчик
            // a woken thread re-checks the count
            sched::block();
        }
    }

    /// Не блокируется. Можно звать из прерывания.
    /// Never blocks. Safe in interrupt context.
    pub fn try_down(&self) -> bool {
        let _guard = IntrGuard::new();
        let mut st = self.state.lock();
        if st.value > 0 {
            st.value -= 1;
            true
        } else {
            false
        }
    }

    /// V: увеличить счётчик и разбудить самого приоритетного ждущего.
    /// V: increment the count and wake the highest-priority waiter.
    pub fn up(&self) {
        let _guard = IntrGuard::new();

        let woken = {
            let mut st = self.state.lock();
            let best = sched::highest_priority_index(st.waiters.iter().copied());
            let woken = best.and_then(|i| st.waiters.remove(i));
            st.value += 1;
            woken
        };

        if let Some(tid) = woken {
            sched::unblock(tid);
        }
        sched::preempt();
    }

    pub fn value(&self) -> u32 {
        let _guard = IntrGuard::new();
        self.state.lock().value
    }
}

/// Пинг-понг между двумя потоками через пару семафоров, 10 раз.
/// Ping-pong between two threads over a pair of semaphores, 10 rounds.
pub fn self_test() -> Result<()> {
    let pair = Arc::new([Semaphore::new(0), Semaphore::new(0)]);
    let helper = Arc::clone(&pair);

    sched::create("sema-test", PRI_DEFAULT, move || {
        for _ in 0..10 {
            helper[0].down();
            helper[1].up();
        }
    })?;

    for _ in 0..10 {
        pair[0].up();
        pair[1].down();
    }
    info!("semaphore self-test: ok");
    Ok(())
}
