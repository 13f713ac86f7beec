use crate::domain::ports::HopperBox;
use crate::error::{CashError, Result};
use tracing::info;

/// A validated change denomination table, largest first.
///
/// Greedy change-making is only optimal for canonical coin systems, so the
/// table is rejected at construction if greedy would ever use more pieces
/// than necessary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denominations {
    values: Vec<u64>,
}

/// Largest denomination as a multiple of the smallest. Bounds the table the
/// canonical check builds.
pub const MAX_DENOMINATION_SPAN: u64 = 100_000;

impl Denominations {
    pub fn new(values: &[u64]) -> Result<Self> {
        let mut values = values.to_vec();
        values.sort_unstable_by(|a, b| b.cmp(a));

        let Some(&unit) = values.last() else {
            return Err(CashError::InvalidDenominations(
                "at least one denomination is required".to_string(),
            ));
        };
        if unit == 0 {
            return Err(CashError::InvalidDenominations(
                "denominations must be non-zero".to_string(),
            ));
        }
        if values.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(CashError::InvalidDenominations(
                "duplicate denomination".to_string(),
            ));
        }
        if let Some(odd) = values.iter().find(|&&value| value % unit != 0) {
            return Err(CashError::InvalidDenominations(format!(
                "{odd} is not a multiple of the smallest denomination {unit}"
            )));
        }
        let span = values[0] / unit;
        if span > MAX_DENOMINATION_SPAN {
            return Err(CashError::InvalidDenominations(format!(
                "largest denomination is {span} times the smallest, limit is {MAX_DENOMINATION_SPAN}"
            )));
        }
        if !is_canonical(&values, unit) {
            return Err(CashError::InvalidDenominations(format!(
                "{values:?} is not a canonical coin system"
            )));
        }

        Ok(Self { values })
    }

    /// The smallest denomination; every payable amount is a multiple of it.
    pub fn unit(&self) -> u64 {
        self.values[self.values.len() - 1]
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// Greedy change plan for `amount`. Nothing is dispensed here.
    pub fn plan(&self, amount: u64) -> Result<Change> {
        let unit = self.unit();
        if amount % unit != 0 {
            return Err(CashError::ChangeNotDivisible { amount, unit });
        }

        let mut remaining = amount;
        let mut pieces = Vec::new();
        for &denomination in &self.values {
            let count = remaining / denomination;
            if count > 0 {
                pieces.push((denomination, count));
                remaining -= denomination * count;
            }
        }
        debug_assert_eq!(remaining, 0);

        Ok(Change { pieces })
    }
}

/// Greedy is optimal for every amount iff it is optimal for every amount
/// below the sum of the two largest denominations (Kozen & Zaks).
fn is_canonical(values: &[u64], unit: u64) -> bool {
    if values.len() < 3 {
        return true;
    }
    let coins: Vec<usize> = values.iter().map(|&v| (v / unit) as usize).collect();
    let limit = coins[0] + coins[1];

    let mut best = vec![usize::MAX; limit + 1];
    best[0] = 0;
    for amount in 1..=limit {
        for &coin in &coins {
            if coin <= amount && best[amount - coin] != usize::MAX {
                best[amount] = best[amount].min(best[amount - coin] + 1);
            }
        }
    }

    (1..=limit).all(|amount| {
        let mut rest = amount;
        let mut pieces = 0;
        for &coin in &coins {
            pieces += rest / coin;
            rest %= coin;
        }
        pieces == best[amount]
    })
}

/// Pieces to dispense, as `(denomination, count)` pairs, largest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Change {
    pieces: Vec<(u64, u64)>,
}

impl Change {
    pub fn pieces(&self) -> &[(u64, u64)] {
        &self.pieces
    }

    pub fn total(&self) -> u64 {
        self.pieces.iter().map(|(value, count)| value * count).sum()
    }

    pub fn piece_count(&self) -> u64 {
        self.pieces.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
}

/// Denomination dispenser: plans change and pays it out through the hopper.
pub struct ChangeBox {
    denominations: Denominations,
    hopper: HopperBox,
}

impl ChangeBox {
    pub fn new(denominations: Denominations, hopper: HopperBox) -> Self {
        Self {
            denominations,
            hopper,
        }
    }

    /// Dispenses exactly `amount`, one piece at a time.
    ///
    /// The plan is computed before the first ejection, so an amount off the
    /// denomination grid fails without dispensing anything.
    pub async fn give_change(&self, amount: u64) -> Result<Change> {
        let change = self.denominations.plan(amount)?;
        for &(denomination, count) in change.pieces() {
            for _ in 0..count {
                self.hopper.eject(denomination).await?;
            }
        }
        info!(amount, pieces = change.piece_count(), "change dispensed");
        Ok(change)
    }
}
