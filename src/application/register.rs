use crate::config::RegisterConfig;
use crate::domain::ports::RelayBox;
use crate::domain::state::CashState;
use crate::error::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Coin,
    Note,
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterKind::Coin => f.write_str("coin"),
            RegisterKind::Note => f.write_str("note"),
        }
    }
}

/// One edge reported by an acceptor's pulse line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// How long the line was held.
    pub width: Duration,
}

impl Pulse {
    /// Comfortably above both acceptors' minimum widths.
    pub const NOMINAL: Self = Self::new(Duration::from_millis(50));

    pub const fn new(width: Duration) -> Self {
        Self { width }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// Credited; carries the balance after the credit.
    Counted { balance: u64 },
    /// Shorter than the acceptor's minimum width.
    Glitch,
    /// Arrived while the register was closed. Not credited.
    Spurious,
}

/// Turns acceptor pulses into balance credits and gates the acceptor.
pub struct InputRegister {
    kind: RegisterKind,
    config: RegisterConfig,
    relay: RelayBox,
    state: Arc<CashState>,
    is_open: AtomicBool,
    last_pulse: Mutex<Option<Instant>>,
    spurious: AtomicU64,
}

impl InputRegister {
    /// Creates a closed register. The relay is released immediately so the
    /// acceptor starts disabled whatever state the line was left in.
    pub fn new(
        kind: RegisterKind,
        config: RegisterConfig,
        relay: RelayBox,
        state: Arc<CashState>,
    ) -> Result<Self> {
        relay.release()?;
        Ok(Self {
            kind,
            config,
            relay,
            state,
            is_open: AtomicBool::new(false),
            last_pulse: Mutex::new(None),
            spurious: AtomicU64::new(0),
        })
    }

    pub fn kind(&self) -> RegisterKind {
        self.kind
    }

    /// Marks the register open before the acceptor is powered, so a pulse
    /// can never arrive while the flag still reads closed.
    pub fn open(&self) -> Result<()> {
        self.is_open.store(true, Ordering::SeqCst);
        if let Err(err) = self.relay.energize() {
            self.is_open.store(false, Ordering::SeqCst);
            return Err(err.into());
        }
        debug!(register = %self.kind, "register opened");
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.relay.release()?;
        self.is_open.store(false, Ordering::SeqCst);
        debug!(register = %self.kind, "register closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }

    /// True if no pulse was counted within `window`, or none ever was.
    pub fn is_quiescent(&self, window: Duration) -> bool {
        match *self.lock_last_pulse() {
            Some(at) => at.elapsed() >= window,
            None => true,
        }
    }

    /// Quiescence over this acceptor's own debounce window.
    pub fn is_settled(&self) -> bool {
        self.is_quiescent(self.config.debounce)
    }

    pub fn last_pulse(&self) -> Option<Instant> {
        *self.lock_last_pulse()
    }

    /// Pulses seen while closed since the register was created.
    pub fn spurious_pulses(&self) -> u64 {
        self.spurious.load(Ordering::SeqCst)
    }

    /// Hardware callback; safe to call from any thread at any time.
    ///
    /// The timestamp is recorded before the balance is credited, so a
    /// concurrent quiescence check can only err towards waiting longer.
    pub fn on_pulse(&self, pulse: Pulse) -> PulseOutcome {
        if pulse.width < self.config.min_pulse_width {
            debug!(register = %self.kind, width = ?pulse.width, "ignoring glitch on pulse line");
            return PulseOutcome::Glitch;
        }
        if !self.is_open() {
            let seen = self.spurious.fetch_add(1, Ordering::SeqCst) + 1;
            warn!(register = %self.kind, seen, "pulse while register closed, not credited");
            return PulseOutcome::Spurious;
        }

        *self.lock_last_pulse() = Some(Instant::now());
        let balance = self.state.add_balance(self.config.denomination);
        debug!(register = %self.kind, balance, "pulse credited");
        PulseOutcome::Counted { balance }
    }

    /// Spawns the listener task that feeds pulses from the hardware event
    /// layer into [`InputRegister::on_pulse`]. It ends when the sender side
    /// is dropped.
    pub fn listen(self: Arc<Self>, mut pulses: mpsc::Receiver<Pulse>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(register = %self.kind, "pulse listener started");
            while let Some(pulse) = pulses.recv().await {
                self.on_pulse(pulse);
            }
            info!(register = %self.kind, "pulse listener stopped");
        })
    }

    fn lock_last_pulse(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_pulse.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
