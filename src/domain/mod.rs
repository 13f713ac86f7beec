//! Domain types of the cash subsystem: shared state, commands, events,
//! change-making and the hardware ports.

pub mod change;
pub mod command;
pub mod event;
pub mod ports;
pub mod state;
