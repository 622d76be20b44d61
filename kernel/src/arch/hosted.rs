//! Hosted machine: ядро поверх потоков хоста (std)
//! Hosted machine: the kernel on top of host threads (std)
//!
//! Каждый поток ядра это отдельный поток хоста. Эстафета (mutex + condvar)
//! гарантирует, что код ядра в каждый момент выполняет ровно один из них:
//! модель одного CPU сохраняется.
//! Every kernel thread is a host thread. A baton (mutex + condvar) makes
//! sure exactly one of them runs kernel code at any moment, preserving
//! the single-CPU model.
//!
//! Таймер не тикает сам: тики подаёт `tick()`, а idle поток в `hlt`
//! подаёт следующий тик сам, если кто-то спит.
//! The timer never fires on its own: `tick()` delivers ticks, and the idle
//! thread's `hlt` delivers the next tick itself when someone is asleep.
//!
//! Паника в любом потоке ядра пересылается потоку `main`.
//! A panic in any kernel thread is forwarded to thread `main`.
//!
//! Уровень прерываний есть только у потоков этой машины. Для чужих потоков
//! хоста (другие тесты) прерывания всегда разрешены и не переключаются.
//! Only this machine's threads have an interrupt level. For foreign host
//! threads (other tests) interrupts always read as on and never toggle.

use std::any::Any;
use std::cell::Cell;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::LevelFilter;

use crate::error::{KernelError, Result};
use crate::logger;
use crate::sched::{self, Policy, Tid};

use super::Machine;

const STACK_SIZE: usize = 256 * 1024;

/// Один запуск ядра за раз на процесс / One kernel boot at a time per process
static BOOT: Mutex<()> = Mutex::new(());
static ACTIVE: Mutex<Option<&'static Hosted>> = Mutex::new(None);

thread_local! {
    /// Машина, на CPU которой выполняется этот поток хоста.
    /// The machine whose CPU this host thread runs on.
    static CPU: Cell<usize> = const { Cell::new(0) };
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Baton {
    /// Чей сейчас ход / Whose turn it is
    running: Option<Tid>,
    main: Option<Tid>,
    panic: Option<String>,
}

struct Shared {
    interrupts: AtomicBool,
    in_interrupt: AtomicBool,
    baton: Mutex<Baton>,
    turn: Condvar,
    console: Mutex<String>,
    live: AtomicUsize,
    fail_spawns: AtomicBool,
}

impl Shared {
    fn cpu_id(&self) -> usize {
        self as *const Shared as usize
    }

    fn enter_cpu(&self) {
        CPU.with(|cpu| cpu.set(self.cpu_id()));
    }

    fn on_cpu(&self) -> bool {
        CPU.with(|cpu| cpu.get()) == self.cpu_id()
    }

    fn pass(&self, to: Tid) {
        let mut baton = lock(&self.baton);
        baton.running = Some(to);
        self.turn.notify_all();
    }

    /// Ждать своего хода. После паники в ядре `main` паникует сам,
    /// а остальные потоки засыпают навсегда.
    /// Wait for our turn. After a kernel panic `main` panics too and
    /// every other thread sleeps forever.
    fn wait_turn(&self, tid: Tid) {
        let mut baton = lock(&self.baton);
        loop {
            if let Some(msg) = baton.panic.clone() {
                if baton.main == Some(tid) {
                    drop(baton);
                    panic!("{}", msg);
                }
                loop {
                    baton = self.turn.wait(baton).unwrap_or_else(PoisonError::into_inner);
                }
            }
            if baton.running == Some(tid) {
                return;
            }
            baton = self.turn.wait(baton).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn poison(&self, tid: Tid, payload: Box<dyn Any + Send>) {
        let msg = match payload.downcast_ref::<&str>() {
            Some(s) => s.to_string(),
            None => match payload.downcast_ref::<String>() {
                Some(s) => s.clone(),
                None => String::from("unknown panic"),
            },
        };
        let mut baton = lock(&self.baton);
        baton.panic = Some(format!("kernel thread {} panicked: {}", tid, msg));
        self.turn.notify_all();
    }
}

pub struct Hosted {
    shared: Arc<Shared>,
}

impl Hosted {
    fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                interrupts: AtomicBool::new(false),
                in_interrupt: AtomicBool::new(false),
                baton: Mutex::new(Baton { running: None, main: None, panic: None }),
                turn: Condvar::new(),
                console: Mutex::new(String::new()),
                live: AtomicUsize::new(0),
                fail_spawns: AtomicBool::new(false),
            }),
        }
    }

    /// Текущий поток хоста становится контекстом `main`.
    /// The calling host thread becomes the context of `main`.
    fn adopt(&self, main: Tid) {
        let mut baton = lock(&self.shared.baton);
        baton.running = Some(main);
        baton.main = Some(main);
        self.shared.live.store(1, Ordering::SeqCst);
    }

    /// Прерывание таймера / Timer interrupt
    fn timer_interrupt(&self) {
        assert!(self.interrupts_enabled(), "hosted: timer interrupt with interrupts off");
        assert!(!self.in_interrupt(), "hosted: nested timer interrupt");

        self.set_interrupts(false);
        self.shared.in_interrupt.store(true, Ordering::SeqCst);
        sched::tick();
        self.shared.in_interrupt.store(false, Ordering::SeqCst);

        if sched::take_yield_request() {
            sched::yield_now();
        }
        self.set_interrupts(true);
    }
}

impl Machine for Hosted {
    fn interrupts_enabled(&self) -> bool {
        !self.shared.on_cpu() || self.shared.interrupts.load(Ordering::SeqCst)
    }

    fn set_interrupts(&self, enabled: bool) {
        if self.shared.on_cpu() {
            self.shared.interrupts.store(enabled, Ordering::SeqCst);
        }
    }

    fn in_interrupt(&self) -> bool {
        self.shared.on_cpu() && self.shared.in_interrupt.load(Ordering::SeqCst)
    }

    fn spawn_context(&self, tid: Tid) -> Result<()> {
        if self.shared.fail_spawns.swap(false, Ordering::SeqCst) {
            return Err(KernelError::NoMemory);
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("kthread-{}", tid))
            .stack_size(STACK_SIZE)
            .spawn(move || {
                shared.enter_cpu();
                shared.wait_turn(tid);
                let result = panic::catch_unwind(|| {
                    sched::thread_entry();
                });
                if let Err(payload) = result {
                    shared.poison(tid, payload);
                }
            });

        match spawned {
            Ok(_) => {
                self.shared.live.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(_) => Err(KernelError::NoMemory),
        }
    }

    fn switch_context(&self, from: Tid, to: Tid) {
        self.shared.pass(to);
        self.shared.wait_turn(from);
    }

    fn exit_context(&self, _from: Tid, to: Tid) -> ! {
        self.shared.pass(to);
        // контекст умершего потока больше не выполняется
        loop {
            thread::park();
        }
    }

    fn release_context(&self, _tid: Tid) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn wait_for_interrupt(&self) {
        assert!(
            sched::sleeping_threads() > 0,
            "hosted: every thread is blocked and none is asleep (deadlock)"
        );
        self.set_interrupts(true);
        self.timer_interrupt();
    }

    fn console_write(&self, s: &str) {
        assert!(
            !self.interrupts_enabled() || !self.shared.on_cpu(),
            "hosted: console written with interrupts on"
        );
        lock(&self.shared.console).push_str(s);
    }
}

// ── Запуск и управление / Boot and control ───────────────────────────────────

/// Загрузить ядро на свежей машине и выполнить `body` как поток `main`.
/// Boot the kernel on a fresh machine and run `body` as thread `main`.
///
/// Запуски сериализуются: глобальное состояние ядра одно на процесс.
/// Boots are serialized: kernel global state is one per process.
pub fn boot<F: FnOnce()>(policy: Policy, body: F) {
    let _serial = lock(&BOOT);

    let machine: &'static Hosted = Box::leak(Box::new(Hosted::new()));
    *lock(&ACTIVE) = Some(machine);
    machine.shared.enter_cpu();
    super::install(machine);
    logger::init(LevelFilter::Debug);

    let main = sched::init(policy);
    machine.adopt(main);
    if let Err(e) = sched::start() {
        panic!("hosted: boot failed: {}", e);
    }

    body();
}

fn active() -> &'static Hosted {
    match *lock(&ACTIVE) {
        Some(machine) => machine,
        None => panic!("hosted: no kernel booted"),
    }
}

/// Подать одно прерывание таймера / Deliver one timer interrupt
pub fn tick() {
    active().timer_interrupt();
}

pub fn ticks(n: u64) {
    for _ in 0..n {
        tick();
    }
}

/// Всё, что ядро написало в консоль / Everything the kernel wrote to the console
pub fn console_output() -> String {
    lock(&active().shared.console).clone()
}

/// Сколько контекстов сейчас выделено / How many contexts are allocated
pub fn live_contexts() -> usize {
    active().shared.live.load(Ordering::SeqCst)
}

/// Следующий `spawn_context` вернёт `NoMemory`.
/// The next `spawn_context` fails with `NoMemory`.
pub fn fail_next_spawn() {
    active().shared.fail_spawns.store(true, Ordering::SeqCst);
}
