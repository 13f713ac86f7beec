use crate::error::CashError;
use std::fmt;
use std::str::FromStr;

/// A command from upstream orchestration, parsed from a text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start accepting cash until `amount` is tendered.
    AcceptCash(u64),
    DenyCash,
    TakeMoney,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AcceptCash(amount) => write!(f, "ACCEPT_CASH {amount}"),
            Command::DenyCash => f.write_str("DENY_CASH"),
            Command::TakeMoney => f.write_str("TAKE_MONEY"),
        }
    }
}

impl FromStr for Command {
    type Err = CashError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| CashError::MalformedCommand {
            frame: frame.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = frame.split_whitespace();
        let Some(tag) = parts.next() else {
            return Err(malformed("empty frame"));
        };

        let command = match tag {
            "ACCEPT_CASH" => {
                let raw = parts.next().ok_or_else(|| malformed("missing amount"))?;
                let amount = raw
                    .parse::<u64>()
                    .map_err(|_| malformed("amount is not a non-negative integer"))?;
                Command::AcceptCash(amount)
            }
            "DENY_CASH" => Command::DenyCash,
            "TAKE_MONEY" => Command::TakeMoney,
            _ => return Err(CashError::UnknownCommand(frame.trim().to_string())),
        };

        if parts.next().is_some() {
            return Err(malformed("unexpected argument"));
        }
        Ok(command)
    }
}
