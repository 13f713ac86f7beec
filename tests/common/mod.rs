#![allow(dead_code)]

use cash_acceptor::application::controller::CashController;
use cash_acceptor::application::register::Pulse;
use cash_acceptor::config::CashConfig;
use cash_acceptor::domain::event::CashEvent;
use cash_acceptor::domain::ports::Hardware;
use cash_acceptor::infrastructure::mock::{MockCollector, MockHopper, MockRelay};
use std::time::Duration;
use tokio::sync::mpsc;

/// A controller wired to mock hardware, with handles on every device.
pub struct Rig {
    pub controller: CashController,
    pub events: mpsc::Receiver<CashEvent>,
    pub coin_relay: MockRelay,
    pub note_relay: MockRelay,
    pub collector: MockCollector,
    pub hopper: MockHopper,
}

pub fn rig() -> Rig {
    rig_with(CashConfig::default())
}

pub fn rig_with(config: CashConfig) -> Rig {
    let coin_relay = MockRelay::new();
    let note_relay = MockRelay::new();
    let collector = MockCollector::new();
    let hopper = MockHopper::new();

    let (tx, events) = mpsc::channel(config.event_capacity);
    let hardware = Hardware {
        coin_relay: Box::new(coin_relay.clone()),
        note_relay: Box::new(note_relay.clone()),
        collector: Box::new(collector.clone()),
        hopper: Box::new(hopper.clone()),
    };
    let controller = CashController::new(&config, hardware, tx).unwrap();

    Rig {
        controller,
        events,
        coin_relay,
        note_relay,
        collector,
        hopper,
    }
}

impl Rig {
    pub fn insert_coins(&self, count: usize) {
        for _ in 0..count {
            self.controller.coin().on_pulse(Pulse::NOMINAL);
        }
    }

    pub fn insert_notes(&self, count: usize) {
        for _ in 0..count {
            self.controller.note().on_pulse(Pulse::NOMINAL);
        }
    }

    /// Events emitted so far, without waiting.
    pub fn drain(&mut self) -> Vec<CashEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Moves the paused test clock forward.
pub async fn wait_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
}
