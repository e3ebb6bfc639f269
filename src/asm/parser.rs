//! Line-oriented program parser.
//!
//! Syntax:
//! ```text
//! loadi 10
//! store 1
//!
//! load 1
//! hold
//! ```
//!
//! Each non-blank line is one instruction: a mnemonic and, for everything but
//! `hold`, a numeric operand; tokens after the operand are ignored. Blank
//! lines are skipped but still count when reporting error lines. Jump targets
//! are indices into the resulting [`Program`], so blank lines do not shift
//! them.

use crate::asm::opcode::Opcode;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A parsed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// `None` only for a `hold` written without a usable operand.
    pub operand: Option<f64>,
}

impl Instruction {
    /// Build an instruction with an integer operand.
    pub fn new(opcode: Opcode, operand: i64) -> Self {
        Self {
            opcode,
            operand: Some(operand as f64),
        }
    }

    /// A bare `hold`.
    pub const fn hold() -> Self {
        Self {
            opcode: Opcode::Hold,
            operand: None,
        }
    }

    /// The operand as an integer, if it is one.
    ///
    /// Fractional, infinite, and out-of-range values yield `None`; the
    /// machine treats those as an invalid operand.
    pub fn integer_operand(&self) -> Option<i64> {
        let value = self.operand?;
        // i64::MAX as f64 rounds up to 2^63, hence the strict bound.
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64
        {
            Some(value as i64)
        } else {
            None
        }
    }
}

/// An ordered instruction sequence. Indices are jump targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `index`, if the index addresses one.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn push(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

/// Parse program text into a [`Program`].
///
/// Stops at the first bad line. The error carries that line's 0-based index
/// within `source`, blank lines included.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let mut program = Program::new();

    for (line, text) in source.split('\n').enumerate() {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let mut tokens = text.split_whitespace();
        let Some(mnemonic) = tokens.next() else {
            continue;
        };

        let opcode = mnemonic
            .parse::<Opcode>()
            .map_err(|e| ParseError::UnknownOpcode { line, mnemonic: e.0 })?;

        let token = tokens.next();
        let operand = token.and_then(parse_number);

        if opcode.requires_operand() && operand.is_none() {
            return Err(ParseError::InvalidOperand {
                line,
                token: token.map(str::to_string),
            });
        }

        program.push(Instruction { opcode, operand });
    }

    tracing::debug!(instructions = program.len(), "parsed program");
    Ok(program)
}

/// Parse a numeric literal.
///
/// Accepts decimal integers and fractions, exponents, `Infinity` with an
/// optional sign, and the unsigned `0x`/`0o`/`0b` radix forms. `NaN` and
/// other spellings of infinity (`inf`, `INFINITY`) are not numbers here.
fn parse_number(token: &str) -> Option<f64> {
    let radix = match token.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };

    if let Some(radix) = radix {
        let digits = &token[2..];
        // from_str_radix would also take a sign after the prefix.
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u64::from_str_radix(digits, radix)
            .ok()
            .map(|v| v as f64);
    }

    let unsigned = token
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(token);
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) && unsigned != "Infinity" {
        return None;
    }

    token.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Errors reported by [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {}: unknown opcode `{mnemonic}`", .line + 1)]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("line {}: {}", .line + 1, describe_operand(.token))]
    InvalidOperand { line: usize, token: Option<String> },
}

fn describe_operand(token: &Option<String>) -> String {
    match token {
        Some(t) => format!("invalid operand `{t}`, expected a number"),
        None => "missing operand".to_string(),
    }
}

impl ParseError {
    /// 0-based index of the offending source line.
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnknownOpcode { line, .. } | ParseError::InvalidOperand { line, .. } => *line,
        }
    }
}
