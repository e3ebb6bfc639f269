//! Program listings.
//!
//! The inverse of the parser: renders instructions back to source text,
//! optionally numbered by instruction index for display.

use crate::asm::parser::{Instruction, Program};
use std::fmt;

/// Format a single instruction as source text.
pub fn format_instruction(instr: &Instruction) -> String {
    match instr.operand {
        Some(x) => format!("{} {}", instr.opcode, format_operand(x)),
        None => instr.opcode.to_string(),
    }
}

/// Integers print without a fractional part; everything else as-is.
fn format_operand(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}

/// Render a program with one numbered line per instruction:
/// ```text
/// 000: loadi 7
/// 001: hold
/// ```
pub fn listing(program: &Program) -> String {
    let mut output = String::new();
    for (index, instr) in program.iter().enumerate() {
        output.push_str(&format!("{:03}: {}\n", index, format_instruction(instr)));
    }
    output
}

/// Render a program as parseable source text.
pub fn to_source(program: &Program) -> String {
    let mut output = String::new();
    for instr in program {
        output.push_str(&format_instruction(instr));
        output.push('\n');
    }
    output
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_instruction(self))
    }
}
