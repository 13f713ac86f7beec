use crate::application::register::RegisterKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashError {
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),
    #[error("Malformed command {frame:?}: {reason}")]
    MalformedCommand { frame: String, reason: String },
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("Protocol violation: {register} register is open during {operation}")]
    RegisterOpen {
        register: RegisterKind,
        operation: &'static str,
    },
    #[error("Change of {amount} is not a multiple of the smallest denomination {unit}")]
    ChangeNotDivisible { amount: u64, unit: u64 },
    #[error("Invalid denomination table: {0}")]
    InvalidDenominations(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid scenario step: {0}")]
    InvalidScenario(String),
    #[error("Event channel closed")]
    EventChannelClosed,
    #[error("Cash controller halted after fault: {0}")]
    Halted(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CashError {
    /// Whether the error must stop the controller from taking further transitions.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CashError::InvalidConfig(_)
                | CashError::InvalidScenario(_)
                | CashError::Csv(_)
                | CashError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CashError>;
