//! # RAM Emulator
//!
//! An educational register machine: a single accumulator, indexed memory
//! registers, conditional jumps, and indirect load/store, executed one
//! instruction at a time.
//!
//! ```
//! use ram::{Machine, Status};
//!
//! let mut machine = Machine::new();
//! machine.load_source("loadi 7\nhold").unwrap();
//! assert_eq!(machine.step(), Status::Continue);
//! assert_eq!(machine.acc(), 7);
//! assert_eq!(machine.step(), Status::Halted);
//! ```

pub mod asm;
pub mod cpu;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use asm::{parse, listing, Instruction, Opcode, ParseError, Program};
pub use cpu::{Machine, RegisterFile, RunOutcome, Status, Ticker};
pub use config::{ConfigError, MachineConfig};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
