//! Runtime configuration for the cash-acceptance subsystem.

use crate::domain::change::Denominations;
use crate::error::{CashError, Result};
use std::time::Duration;

/// Calibration of one mechanical acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterConfig {
    /// Balance credited per accepted pulse, in the smallest currency unit.
    pub denomination: u64,
    /// Silence required after the last pulse before the tally counts as settled.
    pub debounce: Duration,
    /// Pulses shorter than this are treated as line noise.
    pub min_pulse_width: Duration,
}

impl RegisterConfig {
    pub const COIN: Self = Self {
        denomination: 10,
        debounce: Duration::from_secs(1),
        min_pulse_width: Duration::from_millis(25),
    };

    pub const NOTE: Self = Self {
        denomination: 500,
        debounce: Duration::from_secs(2),
        min_pulse_width: Duration::from_millis(45),
    };
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashConfig {
    pub coin: RegisterConfig,
    pub note: RegisterConfig,
    /// Interval between retries of a deferred command.
    pub retry_tick: Duration,
    /// Change denominations, any order.
    pub denominations: Vec<u64>,
    /// Capacity of the outbound event channel.
    pub event_capacity: usize,
}

impl Default for CashConfig {
    fn default() -> Self {
        Self {
            coin: RegisterConfig::COIN,
            note: RegisterConfig::NOTE,
            retry_tick: Duration::from_secs(1),
            denominations: vec![200, 100, 50, 20, 10],
            event_capacity: 16,
        }
    }
}

impl CashConfig {
    /// Checks the configuration for values the controller cannot operate with.
    ///
    /// Register values must be multiples of the smallest change denomination,
    /// otherwise an overpayment could never be paid back exactly.
    pub fn validate(&self) -> Result<()> {
        if self.retry_tick.is_zero() {
            return Err(CashError::InvalidConfig(
                "retry tick must be non-zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(CashError::InvalidConfig(
                "event capacity must be non-zero".to_string(),
            ));
        }

        let denominations = Denominations::new(&self.denominations)?;
        for (name, register) in [("coin", &self.coin), ("note", &self.note)] {
            if register.denomination == 0 {
                return Err(CashError::InvalidConfig(format!(
                    "{name} denomination must be non-zero"
                )));
            }
            if register.denomination % denominations.unit() != 0 {
                return Err(CashError::InvalidConfig(format!(
                    "{name} denomination {} is not a multiple of {}",
                    register.denomination,
                    denominations.unit()
                )));
            }
        }
        Ok(())
    }
}
