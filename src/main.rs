use cash_acceptor::application::controller::CashController;
use cash_acceptor::config::{CashConfig, RegisterConfig};
use cash_acceptor::domain::ports::Hardware;
use cash_acceptor::infrastructure::mock::{MockCollector, MockHopper, MockRelay};
use cash_acceptor::interfaces::csv::scenario_reader::{ScenarioReader, StepInput};
use cash_acceptor::interfaces::event_writer::{EventFormat, EventWriter};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario CSV (`at_ms,input,payload`) to replay against mock hardware
    scenario: PathBuf,

    /// Output format for events written to stdout
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    format: EventFormat,

    /// Time to keep running after the last scenario step
    #[arg(long, default_value_t = 1500)]
    settle_ms: u64,

    /// Balance credited per coin pulse
    #[arg(long, default_value_t = RegisterConfig::COIN.denomination)]
    coin_value: u64,

    /// Balance credited per note pulse
    #[arg(long, default_value_t = RegisterConfig::NOTE.denomination)]
    note_value: u64,

    /// Coin acceptor debounce window
    #[arg(long, default_value_t = 1000)]
    coin_debounce_ms: u64,

    /// Note acceptor debounce window
    #[arg(long, default_value_t = 2000)]
    note_debounce_ms: u64,

    /// Retry interval for deferred commands
    #[arg(long, default_value_t = 1000)]
    retry_tick_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn config(&self) -> CashConfig {
        let defaults = CashConfig::default();
        CashConfig {
            coin: RegisterConfig {
                denomination: self.coin_value,
                debounce: Duration::from_millis(self.coin_debounce_ms),
                ..defaults.coin
            },
            note: RegisterConfig {
                denomination: self.note_value,
                debounce: Duration::from_millis(self.note_debounce_ms),
                ..defaults.note
            },
            retry_tick: Duration::from_millis(self.retry_tick_ms),
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only events.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.config();
    config.validate().into_diagnostic()?;

    let (event_tx, mut event_rx) = mpsc::channel(config.event_capacity);
    let hardware = Hardware {
        coin_relay: Box::new(MockRelay::new()),
        note_relay: Box::new(MockRelay::new()),
        collector: Box::new(MockCollector::new()),
        hopper: Box::new(MockHopper::new()),
    };
    let controller = CashController::new(&config, hardware, event_tx).into_diagnostic()?;

    // Pulse listeners
    let (coin_tx, coin_rx) = mpsc::channel(64);
    let (note_tx, note_rx) = mpsc::channel(64);
    let coin_listener = Arc::clone(controller.coin()).listen(coin_rx);
    let note_listener = Arc::clone(controller.note()).listen(note_rx);

    let (command_tx, command_rx) = mpsc::channel::<String>(16);
    let controller_task = tokio::spawn(controller.run(command_rx));

    let format = cli.format;
    let printer = tokio::spawn(async move {
        let mut writer = EventWriter::new(io::stdout(), format);
        while let Some(event) = event_rx.recv().await {
            writer.write_event(&event)?;
        }
        Ok::<_, cash_acceptor::error::CashError>(())
    });

    // Replay the scenario
    let file = File::open(&cli.scenario).into_diagnostic()?;
    let reader = ScenarioReader::new(file);
    let start = Instant::now();
    for step in reader.steps() {
        let step = step.into_diagnostic()?;
        time::sleep_until(start + step.at()).await;
        match step.input {
            StepInput::Command => {
                let frame = step.frame().into_diagnostic()?.to_string();
                if command_tx.send(frame).await.is_err() {
                    tracing::warn!("controller stopped, skipping remaining commands");
                    break;
                }
            }
            StepInput::Coin => {
                if coin_tx.send(step.pulse().into_diagnostic()?).await.is_err() {
                    tracing::warn!(at_ms = step.at_ms, "coin listener stopped, pulse lost");
                }
            }
            StepInput::Note => {
                if note_tx.send(step.pulse().into_diagnostic()?).await.is_err() {
                    tracing::warn!(at_ms = step.at_ms, "note listener stopped, pulse lost");
                }
            }
        }
    }

    time::sleep(Duration::from_millis(cli.settle_ms)).await;
    drop(command_tx);
    drop(coin_tx);
    drop(note_tx);

    let outcome = controller_task.await.into_diagnostic()?;
    coin_listener.await.into_diagnostic()?;
    note_listener.await.into_diagnostic()?;
    printer.await.into_diagnostic()?.into_diagnostic()?;

    outcome.into_diagnostic()
}
