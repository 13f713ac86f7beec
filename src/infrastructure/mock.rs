use crate::domain::ports::{Collector, CollectorPosition, Hopper, Relay};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// An in-memory relay line.
///
/// Clones share the same line, so a test can keep a handle while the
/// register owns the boxed relay.
#[derive(Debug, Default, Clone)]
pub struct MockRelay {
    energized: Arc<AtomicBool>,
    switches: Arc<AtomicUsize>,
    faulty: Arc<AtomicBool>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_energized(&self) -> bool {
        self.energized.load(Ordering::SeqCst)
    }

    /// While faulty, `energize` fails and leaves the line released.
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::SeqCst);
    }

    /// Number of energize/release calls seen so far.
    pub fn switch_count(&self) -> usize {
        self.switches.load(Ordering::SeqCst)
    }
}

impl Relay for MockRelay {
    fn energize(&self) -> io::Result<()> {
        if self.faulty.load(Ordering::SeqCst) {
            return Err(io::Error::other("relay did not pull in"));
        }
        self.energized.store(true, Ordering::SeqCst);
        self.switches.fetch_add(1, Ordering::SeqCst);
        debug!("relay energized");
        Ok(())
    }

    fn release(&self) -> io::Result<()> {
        self.energized.store(false, Ordering::SeqCst);
        self.switches.fetch_add(1, Ordering::SeqCst);
        debug!("relay released");
        Ok(())
    }
}

/// Records every collector flap movement.
#[derive(Debug, Default, Clone)]
pub struct MockCollector {
    positions: Arc<Mutex<Vec<CollectorPosition>>>,
}

impl MockCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> Vec<CollectorPosition> {
        self.positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current(&self) -> Option<CollectorPosition> {
        self.positions().last().copied()
    }
}

impl Collector for MockCollector {
    fn set_position(&self, position: CollectorPosition) -> io::Result<()> {
        debug!(?position, "collector moved");
        self.positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(position);
        Ok(())
    }
}

/// A hopper with unlimited stock that records each ejected piece.
#[derive(Debug, Default, Clone)]
pub struct MockHopper {
    ejected: Arc<RwLock<Vec<u64>>>,
}

impl MockHopper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ejected(&self) -> Vec<u64> {
        self.ejected.read().await.clone()
    }

    pub async fn total(&self) -> u64 {
        self.ejected.read().await.iter().sum()
    }
}

#[async_trait]
impl Hopper for MockHopper {
    async fn eject(&self, denomination: u64) -> io::Result<()> {
        info!(denomination, "hopper ejected piece");
        self.ejected.write().await.push(denomination);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_relay_shares_state_between_clones() {
        let relay = MockRelay::new();
        let handle = relay.clone();

        relay.energize().unwrap();
        assert!(handle.is_energized());
        relay.release().unwrap();
        assert!(!handle.is_energized());
        assert_eq!(handle.switch_count(), 2);
    }

    #[test]
    fn test_mock_collector_records_positions() {
        let collector = MockCollector::new();
        collector.set_position(CollectorPosition::Collect).unwrap();
        collector.set_position(CollectorPosition::Take).unwrap();

        assert_eq!(
            collector.positions(),
            vec![CollectorPosition::Collect, CollectorPosition::Take]
        );
        assert_eq!(collector.current(), Some(CollectorPosition::Take));
    }

    #[tokio::test]
    async fn test_mock_hopper_totals() {
        let hopper = MockHopper::new();
        hopper.eject(200).await.unwrap();
        hopper.eject(50).await.unwrap();

        assert_eq!(hopper.ejected().await, vec![200, 50]);
        assert_eq!(hopper.total().await, 250);
    }
}
