use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    DenyingCash,
    AcceptingCash,
    PaymentReady,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Status::DenyingCash => "DENYING_CASH",
            Status::AcceptingCash => "ACCEPTING_CASH",
            Status::PaymentReady => "PAYMENT_READY",
        };
        f.write_str(tag)
    }
}

/// A consistent view of the cash state taken under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CashSnapshot {
    /// Tendered balance, in the smallest currency unit.
    pub balance: u64,
    pub required_amount: u64,
    pub status: Status,
}

/// The shared balance, required amount and settlement status.
///
/// Every operation is a single critical section. Callers never hold the
/// lock themselves, so no relay toggling or event emission can happen
/// under it.
#[derive(Debug, Default)]
pub struct CashState {
    inner: Mutex<CashSnapshot>,
}

impl CashState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CashSnapshot {
        *self.lock()
    }

    /// Credits `delta` and returns the new balance.
    pub fn add_balance(&self, delta: u64) -> u64 {
        let mut state = self.lock();
        state.balance = state.balance.saturating_add(delta);
        state.balance
    }

    pub fn reset(&self) {
        *self.lock() = CashSnapshot::default();
    }

    pub fn begin_accept(&self, amount: u64) {
        let mut state = self.lock();
        state.required_amount = amount;
        state.balance = 0;
        state.status = Status::AcceptingCash;
    }

    pub fn mark_ready(&self) {
        self.lock().status = Status::PaymentReady;
    }

    // Mutations are plain stores that cannot panic midway, so a poisoned
    // lock still guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, CashSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
