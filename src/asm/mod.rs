//! Program text handling.
//!
//! This module provides:
//! - The instruction set ([`Opcode`])
//! - A line-oriented parser (text → [`Program`])
//! - Listings (program → text)

pub mod opcode;
pub mod parser;
pub mod listing;

pub use opcode::{Opcode, OperandKind};
pub use parser::{parse, Instruction, ParseError, Program};
pub use listing::{format_instruction, listing, to_source};
