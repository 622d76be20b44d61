//! Политика планирования / Scheduling policy
//!
//! Выбирается один раз при загрузке и больше не меняется.
//! Chosen once at boot and never changed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Фиксированные приоритеты + donation / Fixed priorities + donation
    #[default]
    PriorityDonation,
    /// Multilevel feedback queue: приоритет вычисляется / priority is derived
    Mlfqs,
}

impl Policy {
    /// Передаётся ли приоритет держателю блокировки.
    /// Is priority donated to lock holders.
    pub fn donates(self) -> bool {
        self == Policy::PriorityDonation
    }

    /// Может ли поток сам задавать приоритет.
    /// Can a thread set its own priority.
    pub fn user_priority(self) -> bool {
        self == Policy::PriorityDonation
    }

    pub fn is_mlfqs(self) -> bool {
        self == Policy::Mlfqs
    }
}
