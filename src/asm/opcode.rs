//! The machine's instruction set.
//!
//! Sixteen mnemonics, each taking at most one numeric operand. Register 0 is
//! the accumulator (ACC) and is the implicit source or destination of every
//! data and arithmetic instruction.

use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How an instruction interprets its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    /// The operand is a literal value.
    Immediate,
    /// The operand names a register (must be >= 1).
    Register,
    /// The operand is an instruction index (must be >= 1).
    Target,
    /// The operand is ignored.
    None,
}

/// A machine opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    // ==================== Data Transfer ====================

    /// ACC := R[x]
    Load,
    /// ACC := x
    Loadi,
    /// R[x] := ACC
    Store,
    /// ACC := R[R[x]]
    Loadind,
    /// R[R[x]] := ACC
    Storeind,

    // ==================== Control Flow ====================

    /// PC := x
    Jmp,
    /// PC := x if ACC == 0
    Jeq,
    /// PC := x if ACC >= 0
    Jge,
    /// PC := x if ACC <= 0
    Jle,
    /// PC := x if ACC > 0
    Jgt,
    /// PC := x if ACC < 0
    Jlt,
    /// Stop the machine.
    Hold,

    // ==================== Arithmetic ====================

    /// ACC := ACC + R[x]
    Add,
    /// ACC := ACC - R[x]
    Sub,
    /// ACC := ACC * R[x]
    Mul,
    /// ACC := ACC / R[x]
    Div,
}

impl Opcode {
    /// Every opcode, in the order they are documented.
    pub const ALL: [Opcode; 16] = [
        Opcode::Load,
        Opcode::Loadi,
        Opcode::Store,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jge,
        Opcode::Jle,
        Opcode::Jgt,
        Opcode::Jlt,
        Opcode::Hold,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Loadind,
        Opcode::Storeind,
    ];

    /// The source-text mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Load => "load",
            Opcode::Loadi => "loadi",
            Opcode::Store => "store",
            Opcode::Loadind => "loadind",
            Opcode::Storeind => "storeind",
            Opcode::Jmp => "jmp",
            Opcode::Jeq => "jeq",
            Opcode::Jge => "jge",
            Opcode::Jle => "jle",
            Opcode::Jgt => "jgt",
            Opcode::Jlt => "jlt",
            Opcode::Hold => "hold",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
        }
    }

    /// One-line description shown by `ram-emu opcodes` and the debugger.
    pub const fn description(self) -> &'static str {
        match self {
            Opcode::Load => "load register x into ACC",
            Opcode::Loadi => "load the literal x into ACC",
            Opcode::Store => "store ACC into register x",
            Opcode::Loadind => "load the register addressed by register x into ACC",
            Opcode::Storeind => "store ACC into the register addressed by register x",
            Opcode::Jmp => "jump to instruction x",
            Opcode::Jeq => "jump to instruction x if ACC = 0",
            Opcode::Jge => "jump to instruction x if ACC >= 0",
            Opcode::Jle => "jump to instruction x if ACC <= 0",
            Opcode::Jgt => "jump to instruction x if ACC > 0",
            Opcode::Jlt => "jump to instruction x if ACC < 0",
            Opcode::Hold => "halt the machine",
            Opcode::Add => "add register x to ACC",
            Opcode::Sub => "subtract register x from ACC",
            Opcode::Mul => "multiply ACC by register x",
            Opcode::Div => "divide ACC by register x",
        }
    }

    /// How this opcode reads its operand.
    pub const fn operand_kind(self) -> OperandKind {
        match self {
            Opcode::Loadi => OperandKind::Immediate,
            Opcode::Hold => OperandKind::None,
            Opcode::Jmp
            | Opcode::Jeq
            | Opcode::Jge
            | Opcode::Jle
            | Opcode::Jgt
            | Opcode::Jlt => OperandKind::Target,
            _ => OperandKind::Register,
        }
    }

    /// Whether the parser must see a numeric operand for this opcode.
    pub const fn requires_operand(self) -> bool {
        !matches!(self, Opcode::Hold)
    }

    /// Whether this opcode may redirect the program counter.
    pub const fn is_jump(self) -> bool {
        matches!(self.operand_kind(), OperandKind::Target)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Returned when a token is not one of the sixteen mnemonics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mnemonic `{0}`")]
pub struct UnknownMnemonic(pub String);

impl FromStr for Opcode {
    type Err = UnknownMnemonic;

    /// Mnemonics are case-sensitive: `LOAD` is not `load`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == s)
            .ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(op.mnemonic().parse::<Opcode>(), Ok(op));
            assert_eq!(op.to_string(), op.mnemonic());
        }
    }

    #[test]
    fn test_mnemonics_are_case_sensitive() {
        assert!("LOAD".parse::<Opcode>().is_err());
        assert!("Hold".parse::<Opcode>().is_err());
        assert!("halt".parse::<Opcode>().is_err());
    }

    #[test]
    fn test_operand_kinds() {
        assert_eq!(Opcode::Loadi.operand_kind(), OperandKind::Immediate);
        assert_eq!(Opcode::Hold.operand_kind(), OperandKind::None);
        assert_eq!(Opcode::Storeind.operand_kind(), OperandKind::Register);
        assert_eq!(Opcode::Div.operand_kind(), OperandKind::Register);

        let jumps: Vec<_> = Opcode::ALL.iter().filter(|op| op.is_jump()).collect();
        assert_eq!(jumps.len(), 6);
    }

    #[test]
    fn test_only_hold_skips_operand() {
        let optional: Vec<_> = Opcode::ALL
            .iter()
            .filter(|op| !op.requires_operand())
            .collect();
        assert_eq!(optional, vec![&Opcode::Hold]);
    }

    #[test]
    fn test_serde_uses_mnemonics() {
        let json = serde_json::to_string(&Opcode::Storeind).unwrap();
        assert_eq!(json, "\"storeind\"");
        let op: Opcode = serde_json::from_str("\"jge\"").unwrap();
        assert_eq!(op, Opcode::Jge);
    }
}
