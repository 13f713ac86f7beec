//! Hardware boundary of the cash subsystem.
//!
//! Relay and collector calls are short, bounded GPIO writes and stay
//! synchronous; ejecting a piece from the hopper is a mechanical operation
//! and is awaited.

use async_trait::async_trait;
use std::io;

/// Output line that enables or disables one mechanical acceptor.
pub trait Relay: Send + Sync {
    fn energize(&self) -> io::Result<()>;
    fn release(&self) -> io::Result<()>;
}

/// Where the escrow flap routes inserted cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorPosition {
    /// Escrow is receiving cash from the acceptors.
    Collect,
    /// Escrow is emptied into the cash box.
    Take,
    /// Escrow is returned to the customer.
    Drop,
}

pub trait Collector: Send + Sync {
    fn set_position(&self, position: CollectorPosition) -> io::Result<()>;
}

/// Change hopper; ejects a single piece per call.
#[async_trait]
pub trait Hopper: Send + Sync {
    async fn eject(&self, denomination: u64) -> io::Result<()>;
}

pub type RelayBox = Box<dyn Relay>;
pub type CollectorBox = Box<dyn Collector>;
pub type HopperBox = Box<dyn Hopper>;

/// The physical devices one cash controller drives.
pub struct Hardware {
    pub coin_relay: RelayBox,
    pub note_relay: RelayBox,
    pub collector: CollectorBox,
    pub hopper: HopperBox,
}
