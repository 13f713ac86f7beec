use serde::Serialize;
use std::fmt;

/// Settlement events reported downstream.
///
/// The `Display` form is the wire frame; the serde form is used for JSON
/// output and carries the same data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashEvent {
    AcceptingCash,
    /// Best-effort telemetry; may be dropped under backpressure.
    Progress { balance: u64 },
    PaymentReady,
    PaymentCollected { change: u64 },
    PaymentDropped,
    DenyingCash,
    Fault { reason: String },
}

impl fmt::Display for CashEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashEvent::AcceptingCash => f.write_str("ACCEPTING_CASH"),
            CashEvent::Progress { balance } => write!(f, "ACCEPTING_CASH {balance}"),
            CashEvent::PaymentReady => f.write_str("PAYMENT_READY"),
            CashEvent::PaymentCollected { .. } => f.write_str("PAYMENT_COLLECTED"),
            CashEvent::PaymentDropped => f.write_str("PAYMENT_DROPPED"),
            CashEvent::DenyingCash => f.write_str("DENYING_CASH"),
            CashEvent::Fault { reason } => write!(f, "FAULT {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_frames() {
        assert_eq!(CashEvent::AcceptingCash.to_string(), "ACCEPTING_CASH");
        assert_eq!(
            CashEvent::Progress { balance: 150 }.to_string(),
            "ACCEPTING_CASH 150"
        );
        assert_eq!(
            CashEvent::PaymentCollected { change: 50 }.to_string(),
            "PAYMENT_COLLECTED"
        );
    }

    #[test]
    fn test_json_carries_payload() {
        let json = serde_json::to_string(&CashEvent::PaymentCollected { change: 50 }).unwrap();
        assert_eq!(json, r#"{"event":"PAYMENT_COLLECTED","change":50}"#);

        let json = serde_json::to_string(&CashEvent::PaymentReady).unwrap();
        assert_eq!(json, r#"{"event":"PAYMENT_READY"}"#);
    }
}
