//! In-memory hardware adapters.
//!
//! These stand in for the platform's GPIO layer when the terminal runs in
//! a testing environment or replays a scenario.

pub mod mock;
