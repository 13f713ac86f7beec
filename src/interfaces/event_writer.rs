use crate::domain::event::CashEvent;
use crate::error::Result;
use clap::ValueEnum;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EventFormat {
    /// Wire frames, e.g. `ACCEPTING_CASH 150`.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Writes events one per line, flushing after each so a downstream reader
/// sees settlements as they happen.
pub struct EventWriter<W: Write> {
    writer: W,
    format: EventFormat,
}

impl<W: Write> EventWriter<W> {
    pub fn new(writer: W, format: EventFormat) -> Self {
        Self { writer, format }
    }

    pub fn write_event(&mut self, event: &CashEvent) -> Result<()> {
        match self.format {
            EventFormat::Text => writeln!(self.writer, "{event}")?,
            EventFormat::Json => {
                serde_json::to_writer(&mut self.writer, event)?;
                writeln!(self.writer)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_lines() {
        let mut writer = EventWriter::new(Vec::new(), EventFormat::Text);
        writer.write_event(&CashEvent::AcceptingCash).unwrap();
        writer
            .write_event(&CashEvent::Progress { balance: 40 })
            .unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "ACCEPTING_CASH\nACCEPTING_CASH 40\n");
    }

    #[test]
    fn test_json_lines() {
        let mut writer = EventWriter::new(Vec::new(), EventFormat::Json);
        writer.write_event(&CashEvent::PaymentDropped).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(output, "{\"event\":\"PAYMENT_DROPPED\"}\n");
    }
}
