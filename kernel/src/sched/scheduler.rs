//! Состояние планировщика / Scheduler state
//!
//! Реестр потоков, очередь готовых, спящие, держатели блокировок.
//! Здесь только чистая логика над данными: ни переключений, ни прерываний.
//! Thread registry, ready set, sleepers, lock holders.
//! Pure logic over data only: no switching, no interrupts.
//!
//! Выбор следующего / Next thread selection:
//!   наибольший эффективный приоритет, среди равных FIFO.
//!   highest effective priority, FIFO among equals.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use crate::config::PRI_DEFAULT;
use crate::sync::LockId;

use super::fixed_point::Fixed;
use super::mlfqs;
use super::policy::Policy;
use super::thread::{Priority, Thread, ThreadFunc, ThreadStatus, Tid};
use super::tick::TickStats;

pub struct Scheduler {
    pub(crate) policy: Policy,
    pub(crate) threads: BTreeMap<Tid, Thread>,
    /// Только потоки в состоянии Ready, в порядке вставки.
    /// Only Ready threads, in insertion order.
    pub(crate) ready: VecDeque<Tid>,
    /// Спящие, в порядке засыпания / Sleepers, in order of falling asleep
    pub(crate) sleepers: Vec<Tid>,
    pub(crate) holders: BTreeMap<LockId, Tid>,
    pub(crate) current: Tid,
    pub(crate) idle: Option<Tid>,
    /// Поток, с которого только что переключились / Thread just switched away from
    pub(crate) prev: Option<Tid>,
    next_tid: u64,

    pub(crate) load_avg: Fixed,
    pub(crate) ticks: u64,
    pub(crate) slice_ticks: u32,
    /// Уступить CPU при выходе из прерывания / Yield on interrupt return
    pub(crate) yield_on_return: bool,
    pub(crate) stats: TickStats,
}

impl Scheduler {
    /// Текущий контекст становится потоком `main`.
    /// The running context becomes thread `main`.
    pub fn new(policy: Policy) -> Self {
        let main = Tid(1);
        let mut thread = Thread::new(main, "main", PRI_DEFAULT, ThreadStatus::Running);
        if policy.is_mlfqs() {
            let p = mlfqs::priority_for(thread.recent_cpu, thread.nice);
            thread.base_priority = p;
            thread.priority = p;
        }

        let mut threads = BTreeMap::new();
        threads.insert(main, thread);

        Self {
            policy,
            threads,
            ready: VecDeque::new(),
            sleepers: Vec::new(),
            holders: BTreeMap::new(),
            current: main,
            idle: None,
            prev: None,
            next_tid: main.0 + 1,
            load_avg: Fixed::ZERO,
            ticks: 0,
            slice_ticks: 0,
            yield_on_return: false,
            stats: TickStats::default(),
        }
    }

    /// Зарегистрировать новый поток в состоянии Blocked.
    /// Register a new thread in the Blocked state.
    ///
    /// Под MLFQS поток наследует nice и recent_cpu создателя,
    /// а `priority` игнорируется.
    /// Under MLFQS the thread inherits nice and recent_cpu from its creator
    /// and `priority` is ignored.
    pub(crate) fn register(&mut self, name: &str, priority: Priority, entry: ThreadFunc) -> Tid {
        let tid = Tid(self.next_tid);
        self.next_tid += 1;

        let mut thread = Thread::new(tid, name, priority, ThreadStatus::Blocked);
        thread.entry = Some(entry);
        if self.policy.is_mlfqs() {
            let parent = self.current_thread();
            thread.nice = parent.nice;
            thread.recent_cpu = parent.recent_cpu;
            let p = mlfqs::priority_for(thread.recent_cpu, thread.nice);
            thread.base_priority = p;
            thread.priority = p;
        }

        self.threads.insert(tid, thread);
        tid
    }

    pub(crate) fn thread(&self, tid: Tid) -> &Thread {
        match self.threads.get(&tid) {
            Some(t) => t,
            None => panic!("sched: unknown thread {}", tid),
        }
    }

    pub(crate) fn thread_mut(&mut self, tid: Tid) -> &mut Thread {
        match self.threads.get_mut(&tid) {
            Some(t) => t,
            None => panic!("sched: unknown thread {}", tid),
        }
    }

    pub(crate) fn current_thread(&self) -> &Thread {
        self.thread(self.current)
    }

    pub(crate) fn current_thread_mut(&mut self) -> &mut Thread {
        let cur = self.current;
        self.thread_mut(cur)
    }

    pub(crate) fn is_idle(&self, tid: Tid) -> bool {
        self.idle == Some(tid)
    }

    /// Blocked → Ready.
    pub(crate) fn make_ready(&mut self, tid: Tid) {
        let thread = self.thread_mut(tid);
        assert!(
            thread.status == ThreadStatus::Blocked,
            "unblock: thread {} ({}) is not blocked but {:?}",
            tid, thread.name, thread.status
        );
        thread.status = ThreadStatus::Ready;
        self.ready.push_back(tid);
    }

    /// Индекс первого потока с наибольшим приоритетом.
    /// Index of the first thread with the highest priority.
    pub(crate) fn highest_priority_of(&self, tids: impl IntoIterator<Item = Tid>) -> Option<usize> {
        let mut best: Option<(usize, Priority)> = None;
        for (i, tid) in tids.into_iter().enumerate() {
            let p = self.thread(tid).priority;
            match best {
                Some((_, bp)) if bp >= p => {}
                _ => best = Some((i, p)),
            }
        }
        best.map(|(i, _)| i)
    }

    fn highest_ready_index(&self) -> Option<usize> {
        self.highest_priority_of(self.ready.iter().copied())
    }

    pub(crate) fn highest_ready_priority(&self) -> Option<Priority> {
        self.highest_ready_index()
            .map(|i| self.thread(self.ready[i]).priority)
    }

    /// Снять с очереди готовых лучший поток; если пусто, то idle.
    /// Take the best ready thread off the ready set; idle if empty.
    pub(crate) fn next_thread_to_run(&mut self) -> Tid {
        if let Some(i) = self.highest_ready_index() {
            if let Some(tid) = self.ready.remove(i) {
                return tid;
            }
        }
        match self.idle {
            Some(idle) => idle,
            None => panic!("sched: no thread to run"),
        }
    }

    /// Есть ли готовый поток важнее текущего.
    /// Is there a ready thread that outranks the running one.
    pub(crate) fn current_outranked(&self) -> bool {
        match self.highest_ready_priority() {
            None => false,
            Some(_) if self.is_idle(self.current) => true,
            Some(p) => p > self.current_thread().priority,
        }
    }

    /// Готовые + текущий, без idle.
    /// Ready plus running, idle excluded.
    pub(crate) fn ready_threads(&self) -> usize {
        let running = if self.is_idle(self.current) { 0 } else { 1 };
        self.ready.len() + running
    }
}
