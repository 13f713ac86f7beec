use crate::application::register::Pulse;
use crate::error::{CashError, Result};
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;

/// Which input a scenario step drives.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum StepInput {
    /// Send `payload` as a command frame.
    Command,
    /// Fire a pulse on the coin acceptor line.
    Coin,
    /// Fire a pulse on the note acceptor line.
    Note,
}

/// One timed row of a scenario script: `at_ms,input,payload`.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct ScenarioStep {
    /// Offset from the start of the replay.
    pub at_ms: u64,
    pub input: StepInput,
    /// Command frame, or pulse width in milliseconds for pulse rows.
    #[serde(default)]
    pub payload: Option<String>,
}

impl ScenarioStep {
    pub fn at(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }

    /// The command frame of a `command` row.
    pub fn frame(&self) -> Result<&str> {
        match (self.input, self.payload.as_deref()) {
            (StepInput::Command, Some(frame)) => Ok(frame),
            (StepInput::Command, None) => Err(CashError::InvalidScenario(format!(
                "command step at {} ms has no frame",
                self.at_ms
            ))),
            (input, _) => Err(CashError::InvalidScenario(format!(
                "{input:?} step at {} ms is not a command",
                self.at_ms
            ))),
        }
    }

    /// The pulse of a `coin`/`note` row; the width defaults to nominal.
    pub fn pulse(&self) -> Result<Pulse> {
        match self.payload.as_deref() {
            None => Ok(Pulse::NOMINAL),
            Some(width) => width
                .parse::<u64>()
                .map(|ms| Pulse::new(Duration::from_millis(ms)))
                .map_err(|_| {
                    CashError::InvalidScenario(format!(
                        "pulse width {width:?} at {} ms is not a whole number of milliseconds",
                        self.at_ms
                    ))
                }),
        }
    }
}

/// Reads scenario steps from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record
/// lengths, so the payload column may be omitted on pulse rows.
pub struct ScenarioReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ScenarioReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes steps in file order.
    pub fn steps(self) -> impl Iterator<Item = Result<ScenarioStep>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CashError::from))
    }
}
