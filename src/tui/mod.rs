//! TUI debugger for the register machine.
//!
//! Provides an interactive terminal-based debugger with:
//! - Program listing with the program counter marked
//! - Register file view
//! - Step/run/pause/reset controls at an adjustable tick rate

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
