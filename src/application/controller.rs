use crate::application::register::{InputRegister, RegisterKind};
use crate::config::CashConfig;
use crate::domain::change::{ChangeBox, Denominations};
use crate::domain::command::Command;
use crate::domain::event::CashEvent;
use crate::domain::ports::{CollectorBox, CollectorPosition, Hardware};
use crate::domain::state::{CashSnapshot, CashState, Status};
use crate::error::{CashError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time;
use tracing::{debug, error, info, warn};

/// Result of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    /// A precondition (acceptor quiescence) is not met yet; retry later.
    Deferred,
    /// The command has no handler in the current state.
    Ignored,
}

/// The single command awaiting a retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub command: Command,
    pub frame: String,
}

enum Wake {
    Frame(String),
    Tick,
    Closed,
}

/// The command-driven cash state machine.
///
/// The controller owns the [`CashState`] and hands it to both input
/// registers at construction; the registers only ever credit the balance,
/// every other mutation happens here.
pub struct CashController {
    state: Arc<CashState>,
    coin: Arc<InputRegister>,
    note: Arc<InputRegister>,
    change_box: ChangeBox,
    collector: CollectorBox,
    events: mpsc::Sender<CashEvent>,
    retry_tick: Duration,
    pending: Option<PendingCommand>,
    last_reported: u64,
    fault: Option<String>,
}

impl CashController {
    /// Creates the controller, its cash state and both (closed) registers.
    ///
    /// # Arguments
    ///
    /// * `config` - Register calibration, retry tick and change denominations.
    /// * `hardware` - Relays, collector flap and change hopper.
    /// * `events` - Downstream event channel.
    pub fn new(
        config: &CashConfig,
        hardware: Hardware,
        events: mpsc::Sender<CashEvent>,
    ) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(CashState::new());
        let coin = InputRegister::new(
            RegisterKind::Coin,
            config.coin,
            hardware.coin_relay,
            Arc::clone(&state),
        )?;
        let note = InputRegister::new(
            RegisterKind::Note,
            config.note,
            hardware.note_relay,
            Arc::clone(&state),
        )?;
        let change_box = ChangeBox::new(
            Denominations::new(&config.denominations)?,
            hardware.hopper,
        );

        Ok(Self {
            state,
            coin: Arc::new(coin),
            note: Arc::new(note),
            change_box,
            collector: hardware.collector,
            events,
            retry_tick: config.retry_tick,
            pending: None,
            last_reported: 0,
            fault: None,
        })
    }

    pub fn coin(&self) -> &Arc<InputRegister> {
        &self.coin
    }

    pub fn note(&self) -> &Arc<InputRegister> {
        &self.note
    }

    pub fn snapshot(&self) -> CashSnapshot {
        self.state.snapshot()
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// The reason the controller halted, if it did.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Consumes command frames until the channel closes or a fatal error.
    ///
    /// Waits indefinitely while idle, and at most one retry tick while a
    /// command is pending or cash is being accepted.
    pub async fn run(mut self, mut commands: mpsc::Receiver<String>) -> Result<()> {
        info!(retry_tick = ?self.retry_tick, "cash controller started");
        loop {
            let wake = if self.needs_tick() {
                match time::timeout(self.retry_tick, commands.recv()).await {
                    Ok(Some(frame)) => Wake::Frame(frame),
                    Ok(None) => Wake::Closed,
                    Err(_) => Wake::Tick,
                }
            } else {
                match commands.recv().await {
                    Some(frame) => Wake::Frame(frame),
                    None => Wake::Closed,
                }
            };

            match wake {
                Wake::Frame(frame) => {
                    self.submit(&frame).await?;
                }
                Wake::Tick => self.tick().await?,
                Wake::Closed => {
                    self.shutdown();
                    return Ok(());
                }
            }
        }
    }

    /// Handles one inbound frame.
    ///
    /// The pending command, if any, is retried before the new command is
    /// dispatched, so commands take effect in arrival order. A new command
    /// that completes clears the pending slot and one that defers takes it
    /// over, except a status probe, which never displaces another command.
    /// An ignored command leaves the slot untouched.
    pub async fn submit(&mut self, frame: &str) -> Result<Outcome> {
        self.ensure_running()?;
        let result = self.process_frame(frame).await;
        self.trip(result).await
    }

    /// Timer tick: retries the pending command, or polls payment status
    /// while accepting cash.
    pub async fn tick(&mut self) -> Result<()> {
        self.ensure_running()?;
        let result = self.service().await;
        self.trip(result).await
    }

    async fn process_frame(&mut self, frame: &str) -> Result<Outcome> {
        let command: Command = frame.parse()?;
        debug!(%command, "command received");

        self.retry_pending().await?;
        let probe = matches!(command, Command::AcceptCash(_))
            && self.state.snapshot().status == Status::AcceptingCash;
        let outcome = self.dispatch(command).await?;
        match outcome {
            Outcome::Complete => {
                if let Some(previous) = self.pending.take() {
                    debug!(previous = %previous.command, %command, "pending command cleared");
                }
            }
            Outcome::Deferred if probe && self.pending.is_some() => {
                debug!(%command, "status probe deferred behind pending command");
            }
            Outcome::Deferred => {
                let pending = PendingCommand {
                    command,
                    frame: frame.trim().to_string(),
                };
                if let Some(previous) = self.pending.replace(pending) {
                    debug!(previous = %previous.command, %command, "pending command superseded");
                }
            }
            Outcome::Ignored => {}
        }
        Ok(outcome)
    }

    async fn service(&mut self) -> Result<()> {
        if self.pending.is_some() {
            self.retry_pending().await
        } else if self.state.snapshot().status == Status::AcceptingCash {
            self.update_payment_status().await.map(|_| ())
        } else {
            Ok(())
        }
    }

    async fn retry_pending(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        match self.dispatch(pending.command).await? {
            Outcome::Complete => debug!(command = %pending.command, "pending command resolved"),
            Outcome::Deferred => self.pending = Some(pending),
            Outcome::Ignored => {
                debug!(command = %pending.command, "pending command no longer applies, dropped")
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        let status = self.state.snapshot().status;
        match (status, command) {
            (Status::DenyingCash, Command::AcceptCash(amount)) => self.enable_cash(amount).await,
            // A repeated accept is a status probe.
            (Status::AcceptingCash, Command::AcceptCash(_)) => self.update_payment_status().await,
            (
                Status::DenyingCash | Status::AcceptingCash | Status::PaymentReady,
                Command::DenyCash,
            ) => self.cancel_cash().await,
            (Status::PaymentReady, Command::TakeMoney) => self.collect_payment().await,
            (Status::PaymentReady, Command::AcceptCash(_))
            | (Status::DenyingCash | Status::AcceptingCash, Command::TakeMoney) => {
                debug!(%status, %command, "command ignored in current state");
                Ok(Outcome::Ignored)
            }
        }
    }

    async fn enable_cash(&mut self, amount: u64) -> Result<Outcome> {
        self.ensure_closed("enable cash")?;
        let status = self.state.snapshot().status;
        if status != Status::DenyingCash {
            return Err(CashError::ProtocolViolation(format!(
                "enable cash while {status}"
            )));
        }
        if !self.registers_quiescent() {
            debug!(amount, "acceptors still settling, deferring enable");
            return Ok(Outcome::Deferred);
        }

        self.state.begin_accept(amount);
        self.last_reported = 0;
        self.collector.set_position(CollectorPosition::Collect)?;
        self.open_registers()?;
        info!(amount, "accepting cash");
        self.emit(CashEvent::AcceptingCash).await?;
        Ok(Outcome::Complete)
    }

    async fn update_payment_status(&mut self) -> Result<Outcome> {
        let CashSnapshot {
            balance,
            required_amount,
            ..
        } = self.state.snapshot();

        if balance >= required_amount {
            if !self.registers_quiescent() {
                debug!(balance, required_amount, "amount reached, waiting for acceptors to settle");
                return Ok(Outcome::Deferred);
            }
            self.close_registers()?;
            self.state.mark_ready();
            self.last_reported = balance;
            info!(balance, required_amount, "payment ready");
            self.emit(CashEvent::PaymentReady).await?;
            return Ok(Outcome::Complete);
        }

        if balance > self.last_reported && self.report_progress(balance) {
            self.last_reported = balance;
        }
        Ok(Outcome::Deferred)
    }

    async fn cancel_cash(&mut self) -> Result<Outcome> {
        let snapshot = self.state.snapshot();
        match snapshot.status {
            Status::DenyingCash => Ok(Outcome::Complete),
            Status::AcceptingCash => {
                if !self.registers_quiescent() {
                    debug!("acceptors still settling, deferring cancel");
                    return Ok(Outcome::Deferred);
                }
                self.close_registers()?;
                self.state.reset();
                self.last_reported = 0;
                info!(balance = snapshot.balance, "cash acceptance cancelled");
                self.emit(CashEvent::DenyingCash).await?;
                Ok(Outcome::Complete)
            }
            Status::PaymentReady => {
                if !self.registers_quiescent() {
                    debug!("acceptors still settling, deferring drop");
                    return Ok(Outcome::Deferred);
                }
                self.drop_payment().await
            }
        }
    }

    async fn drop_payment(&mut self) -> Result<Outcome> {
        self.ensure_closed("drop payment")?;
        let balance = self.state.snapshot().balance;

        self.collector.set_position(CollectorPosition::Drop)?;
        self.state.reset();
        self.last_reported = 0;
        info!(balance, "payment dropped, escrow returned");
        self.emit(CashEvent::PaymentDropped).await?;
        Ok(Outcome::Complete)
    }

    async fn collect_payment(&mut self) -> Result<Outcome> {
        self.ensure_closed("collect payment")?;
        if !self.registers_quiescent() {
            debug!("acceptors still settling, deferring collection");
            return Ok(Outcome::Deferred);
        }

        let CashSnapshot {
            balance,
            required_amount,
            ..
        } = self.state.snapshot();
        let overpayment = balance.checked_sub(required_amount).ok_or_else(|| {
            CashError::ProtocolViolation(format!(
                "balance {balance} below required amount {required_amount} at collection"
            ))
        })?;

        if overpayment > 0 {
            self.change_box.give_change(overpayment).await?;
        }
        self.collector.set_position(CollectorPosition::Take)?;
        self.state.reset();
        self.last_reported = 0;
        info!(balance, required_amount, change = overpayment, "payment collected");
        self.emit(CashEvent::PaymentCollected {
            change: overpayment,
        })
        .await?;
        Ok(Outcome::Complete)
    }

    // Coin before note, always.
    fn registers_quiescent(&self) -> bool {
        self.coin.is_settled() && self.note.is_settled()
    }

    fn ensure_closed(&self, operation: &'static str) -> Result<()> {
        for register in [&self.coin, &self.note] {
            if register.is_open() {
                return Err(CashError::RegisterOpen {
                    register: register.kind(),
                    operation,
                });
            }
        }
        Ok(())
    }

    fn open_registers(&self) -> Result<()> {
        self.coin.open()?;
        self.note.open()
    }

    fn close_registers(&self) -> Result<()> {
        self.coin.close()?;
        self.note.close()
    }

    fn needs_tick(&self) -> bool {
        self.pending.is_some() || self.state.snapshot().status == Status::AcceptingCash
    }

    async fn emit(&self, event: CashEvent) -> Result<()> {
        debug!(%event, "emitting event");
        self.events
            .send(event)
            .await
            .map_err(|_| CashError::EventChannelClosed)
    }

    fn report_progress(&self, balance: u64) -> bool {
        match self.events.try_send(CashEvent::Progress { balance }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(balance, "event channel full, dropping progress update");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(balance, "event channel closed, dropping progress update");
                false
            }
        }
    }

    fn ensure_running(&self) -> Result<()> {
        match &self.fault {
            Some(reason) => Err(CashError::Halted(reason.clone())),
            None => Ok(()),
        }
    }

    async fn trip<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_fatal()
        {
            self.halt(err).await;
        }
        result
    }

    /// Stops all further transitions and surfaces the fault downstream.
    async fn halt(&mut self, err: &CashError) {
        let reason = err.to_string();
        error!(%reason, "cash controller halted");

        for register in [&self.coin, &self.note] {
            if let Err(close_err) = register.close() {
                error!(register = %register.kind(), error = %close_err, "failed to close register while halting");
            }
        }
        self.pending = None;
        if self
            .events
            .send(CashEvent::Fault {
                reason: reason.clone(),
            })
            .await
            .is_err()
        {
            warn!("fault event not delivered, event channel closed");
        }
        self.fault = Some(reason);
    }

    fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            warn!(frame = %pending.frame, "discarding pending command on shutdown");
        }
        for register in [&self.coin, &self.note] {
            if let Err(err) = register.close() {
                error!(register = %register.kind(), error = %err, "failed to close register on shutdown");
            }
        }
        info!(status = %self.state.snapshot().status, "cash controller stopped");
    }
}
