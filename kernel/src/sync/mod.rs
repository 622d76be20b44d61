//! Synchronization Primitives
//!
//! Блокирующие примитивы поверх block/unblock планировщика.
//! Blocking primitives on top of the scheduler's block/unblock.
//!
//! ```text
//! Semaphore → счётчик + ожидающие / counter + waiters
//! Lock      → семафор(1) + владелец, donation / semaphore(1) + owner, donation
//! Condvar   → Mesa-style, всегда вместе с Lock / always together with a Lock
//! ```
//!
//! Правила / Rules:
//!   - down / acquire / wait: только из потока, не из прерывания
//!     only from thread context, never from an interrupt
//!   - up / try_down / try_acquire: можно из прерывания / fine in an interrupt
//!   - будим всегда самого приоритетного ждущего / always wake the highest-priority waiter

pub mod condvar;
pub mod lock;
pub mod semaphore;

pub use condvar::Condvar;
pub use lock::{Lock, LockId};
pub use semaphore::Semaphore;
