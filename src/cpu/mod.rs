//! The register machine.
//!
//! - A register file of 256 integer cells, register 0 being the accumulator
//! - A program counter indexing the loaded [`Program`](crate::Program)
//! - A tick-at-a-time executor with step, run, stop, and reset operations

pub mod registers;
pub mod execute;
pub mod clock;

pub use registers::{RegisterFile, ACC};
pub use execute::{Machine, RunOutcome, Status};
pub use clock::Ticker;
