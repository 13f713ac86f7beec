//! Outer surfaces of the binary: scenario input and event output.

pub mod csv;
pub mod event_writer;
