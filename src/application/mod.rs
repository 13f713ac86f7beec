//! Application layer: the input registers and the command-driven cash
//! controller that arbitrates them.
//!
//! The controller runs as a single tokio task consuming raw command frames;
//! each register's pulse listener runs as its own task and credits the
//! shared [`CashState`](crate::domain::state::CashState) directly.

pub mod controller;
pub mod register;
