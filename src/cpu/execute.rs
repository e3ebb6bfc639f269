//! Execution engine.
//!
//! [`Machine::run_tick`] is the whole fetch-execute cycle: one instruction
//! per call, reported as a [`Status`]. Everything else (single-stepping,
//! continuous runs, reset) is bookkeeping around it.

use crate::asm::opcode::Opcode;
use crate::asm::parser::{self, Instruction, ParseError, Program};
use crate::config::MachineConfig;
use crate::cpu::registers::RegisterFile;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Outcome of executing one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Status {
    /// The instruction executed; keep going.
    Continue,
    /// A `hold` was reached.
    Halted,
    /// The program counter does not address an instruction.
    NoInstruction,
    /// The operand was missing, not an integer, or not allowed here. A
    /// `div` by a register holding 0 (or `i64::MIN / -1`) lands here too.
    InvalidOperand,
}

impl Status {
    /// The numeric status code: 1, 0, -1, or -2.
    pub const fn code(self) -> i8 {
        match self {
            Status::Continue => 1,
            Status::Halted => 0,
            Status::NoInstruction => -1,
            Status::InvalidOperand => -2,
        }
    }

    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Status::Continue),
            0 => Some(Status::Halted),
            -1 => Some(Status::NoInstruction),
            -2 => Some(Status::InvalidOperand),
            _ => None,
        }
    }

    pub const fn is_continue(self) -> bool {
        matches!(self, Status::Continue)
    }

    /// `true` for the two runtime faults.
    pub const fn is_error(self) -> bool {
        matches!(self, Status::NoInstruction | Status::InvalidOperand)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Continue => "running",
            Status::Halted => "halted",
            Status::NoInstruction => "no instruction at program counter",
            Status::InvalidOperand => "invalid operand",
        };
        write!(f, "{} ({})", text, self.code())
    }
}

impl From<Status> for i8 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl TryFrom<i8> for Status {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        Status::from_code(code).ok_or_else(|| format!("unknown status code {code}"))
    }
}

/// Result of [`Machine::run_limited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Status of the last tick; `Continue` if the tick limit was reached.
    pub status: Status,
    /// Number of ticks executed, the final one included.
    pub ticks: u64,
}

/// The register machine.
#[derive(Clone, Serialize)]
pub struct Machine {
    registers: RegisterFile,
    program: Program,
    pc: usize,
    config: MachineConfig,
    running: bool,
    last_status: Status,
    /// Ticks that returned `Continue` since the last load or reset.
    cycles: u64,
}

impl Machine {
    /// Create a machine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    /// Create a machine with zeroed registers and no program.
    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            registers: RegisterFile::new(config.register_count),
            program: Program::new(),
            pc: 0,
            config,
            running: false,
            last_status: Status::Halted,
            cycles: 0,
        }
    }

    // ==================== Program Loading ====================

    /// Replace the program and rewind the program counter.
    ///
    /// Registers are left alone; use [`reset`](Self::reset) to clear them.
    pub fn load(&mut self, program: Program) {
        tracing::info!(instructions = program.len(), "program loaded");
        self.program = program;
        self.pc = 0;
        self.cycles = 0;
    }

    /// Parse `source` and load it. On a parse error the current program
    /// stays loaded.
    pub fn load_source(&mut self, source: &str) -> Result<usize, ParseError> {
        let program = parser::parse(source)?;
        let len = program.len();
        self.load(program);
        Ok(len)
    }

    // ==================== Driver Operations ====================

    /// Execute one instruction and record the outcome as the last status.
    pub fn step(&mut self) -> Status {
        let status = self.run_tick();
        self.last_status = status;
        status
    }

    /// Begin a continuous run with `delay_ms` between ticks.
    ///
    /// Any run already in progress is stopped first. The machine does not
    /// schedule anything itself: the host calls [`tick`](Self::tick) each
    /// time the delay elapses.
    pub fn start(&mut self, delay_ms: u64) {
        self.stop();
        self.config.delay_ms = delay_ms;
        self.running = true;
        tracing::info!(delay_ms, pc = self.pc, "run started");
    }

    /// The host's timer callback while running.
    ///
    /// Returns `None` without touching any state when the machine is not
    /// running. Otherwise executes one tick, records it, and stops the run
    /// on anything but [`Status::Continue`].
    pub fn tick(&mut self) -> Option<Status> {
        if !self.running {
            return None;
        }
        let status = self.step();
        if !status.is_continue() {
            self.stop();
        }
        Some(status)
    }

    /// End a continuous run. Calling it while idle does nothing.
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!(pc = self.pc, status = self.last_status.code(), "run stopped");
        }
        self.running = false;
    }

    /// Stop, zero the reset span of the register file, and rewind to the
    /// first instruction. The loaded program is kept.
    pub fn reset(&mut self) {
        self.stop();
        self.last_status = Status::Halted;
        self.registers.clear_range(self.config.reset_span);
        self.pc = 0;
        self.cycles = 0;
        tracing::info!(reset_span = self.config.reset_span, "machine reset");
    }

    /// Step until a tick returns something other than `Continue`, or until
    /// `max_ticks` ticks have run.
    pub fn run_limited(&mut self, max_ticks: u64) -> RunOutcome {
        let mut ticks = 0;
        let mut status = Status::Continue;

        while ticks < max_ticks {
            status = self.step();
            ticks += 1;
            if !status.is_continue() {
                break;
            }
        }

        RunOutcome { status, ticks }
    }

    // ==================== Execution ====================

    /// Execute the instruction at the program counter.
    ///
    /// Nothing is mutated unless the result is [`Status::Continue`].
    pub fn run_tick(&mut self) -> Status {
        let Some(instr) = self.program.get(self.pc).copied() else {
            tracing::warn!(pc = self.pc, "no instruction at program counter");
            return Status::NoInstruction;
        };

        if instr.opcode == Opcode::Hold {
            tracing::debug!(pc = self.pc, "hold");
            return Status::Halted;
        }

        let next = instr
            .integer_operand()
            .and_then(|x| self.execute(instr.opcode, x));

        match next {
            Some(next) => {
                tracing::debug!(pc = self.pc, next, opcode = %instr.opcode, acc = self.registers.acc(), "tick");
                self.pc = next;
                self.cycles += 1;
                Status::Continue
            }
            None => {
                tracing::warn!(pc = self.pc, ?instr, "invalid operand");
                Status::InvalidOperand
            }
        }
    }

    /// Apply one opcode. Returns the next program counter, or `None` if the
    /// operand is not valid for this opcode, in which case nothing changed.
    fn execute(&mut self, opcode: Opcode, x: i64) -> Option<usize> {
        let mut next = self.pc + 1;

        if opcode == Opcode::Loadi {
            self.registers.set_acc(x);
            return Some(next);
        }

        // Every remaining opcode addresses a register or an instruction,
        // and neither may be 0.
        let r = register_index(x)?;
        let acc = self.registers.acc();

        match opcode {
            // ==================== Data Transfer ====================

            Opcode::Load => {
                self.registers.set_acc(self.registers.read(r));
            }

            Opcode::Store => {
                if !self.registers.write(r, acc) {
                    return None;
                }
            }

            Opcode::Loadind => {
                let addr = usize::try_from(self.registers.read(r)).ok()?;
                self.registers.set_acc(self.registers.read(addr));
            }

            Opcode::Storeind => {
                let addr = usize::try_from(self.registers.read(r)).ok()?;
                if !self.registers.write(addr, acc) {
                    return None;
                }
            }

            // ==================== Arithmetic ====================

            Opcode::Add => self.registers.set_acc(acc.wrapping_add(self.registers.read(r))),
            Opcode::Sub => self.registers.set_acc(acc.wrapping_sub(self.registers.read(r))),
            Opcode::Mul => self.registers.set_acc(acc.wrapping_mul(self.registers.read(r))),

            Opcode::Div => {
                // Zero divisor (and MIN / -1) is an invalid operand.
                let quotient = acc.checked_div(self.registers.read(r))?;
                self.registers.set_acc(quotient);
            }

            // ==================== Control Flow ====================

            Opcode::Jmp => next = r,
            Opcode::Jeq => {
                if acc == 0 {
                    next = r;
                }
            }
            Opcode::Jge => {
                if acc >= 0 {
                    next = r;
                }
            }
            Opcode::Jle => {
                if acc <= 0 {
                    next = r;
                }
            }
            Opcode::Jgt => {
                if acc > 0 {
                    next = r;
                }
            }
            Opcode::Jlt => {
                if acc < 0 {
                    next = r;
                }
            }

            // Handled before dispatch.
            Opcode::Loadi | Opcode::Hold => {}
        }

        Some(next)
    }

    // ==================== Observation ====================

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Value of register `index` (0 past the end).
    pub fn register(&self, index: usize) -> i64 {
        self.registers.read(index)
    }

    /// The accumulator.
    pub fn acc(&self) -> i64 {
        self.registers.acc()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Index of the next instruction to execute.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// The instruction the program counter addresses, if any.
    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.program.get(self.pc)
    }

    /// Whether a continuous run is active.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_status(&self) -> Status {
        self.last_status
    }

    /// Interval between ticks while running.
    pub fn delay_ms(&self) -> u64 {
        self.config.delay_ms
    }

    /// Change the interval used by the next [`start`](Self::start) by a host
    /// that restarts with [`delay_ms`](Self::delay_ms).
    pub fn set_delay_ms(&mut self, delay_ms: u64) {
        self.config.delay_ms = delay_ms;
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

/// A register or jump-target operand: at least 1.
fn register_index(x: i64) -> Option<usize> {
    if x < 1 {
        return None;
    }
    usize::try_from(x).ok()
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("pc", &self.pc)
            .field("running", &self.running)
            .field("last_status", &self.last_status)
            .field("cycles", &self.cycles)
            .field("registers", &self.registers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(source: &str) -> Machine {
        let mut m = Machine::new();
        m.load_source(source).unwrap();
        m
    }

    #[test]
    fn test_loadi_then_hold() {
        let mut m = machine("loadi 7\nhold");

        assert_eq!(m.step(), Status::Continue);
        assert_eq!(m.acc(), 7);
        assert_eq!(m.last_status(), Status::Continue);

        assert_eq!(m.step(), Status::Halted);
        assert_eq!(m.last_status(), Status::Halted);

        let before = m.clone();
        for _ in 0..3 {
            assert_eq!(m.step(), Status::Halted);
        }
        assert_eq!(m.pc(), before.pc());
        assert_eq!(m.registers(), before.registers());
    }

    #[test]
    fn test_store_and_load() {
        let mut m = machine("loadi 5\nstore 1\nloadi 0\nload 1\nhold");
        for _ in 0..4 {
            assert_eq!(m.step(), Status::Continue);
        }
        assert_eq!(m.acc(), 5);
        assert_eq!(m.register(1), 5);
        assert_eq!(m.step(), Status::Halted);
    }

    #[test]
    fn test_jump_past_end() {
        let mut m = machine("jmp 5");
        assert_eq!(m.step(), Status::Continue);
        assert_eq!(m.pc(), 5);
        assert_eq!(m.step(), Status::NoInstruction);
        assert_eq!(m.pc(), 5);
    }

    #[test]
    fn test_empty_program() {
        let mut m = Machine::new();
        assert_eq!(m.step(), Status::NoInstruction);
    }

    #[test]
    fn test_register_operand_zero_is_invalid() {
        for op in ["add", "sub", "mul", "div", "load", "store", "loadind", "storeind"] {
            let mut m = machine(&format!("loadi 1\n{op} 0"));
            m.step();
            assert_eq!(m.step(), Status::InvalidOperand, "{op} 0");
            assert_eq!(m.acc(), 1, "{op} 0 changed ACC");
            assert_eq!(m.pc(), 1, "{op} 0 moved the program counter");
        }
    }

    #[test]
    fn test_negative_operand_is_invalid() {
        let mut m = machine("loadi 3\nadd -1");
        m.step();
        assert_eq!(m.step(), Status::InvalidOperand);
        assert_eq!(m.acc(), 3);
    }

    #[test]
    fn test_jump_to_zero_is_invalid() {
        for op in ["jmp", "jeq", "jge", "jle", "jgt", "jlt"] {
            let mut m = machine(&format!("{op} 0"));
            assert_eq!(m.step(), Status::InvalidOperand, "{op} 0");
            assert_eq!(m.pc(), 0);
        }
    }

    #[test]
    fn test_fractional_operand_is_invalid() {
        let mut m = machine("loadi 2.5\nhold");
        assert_eq!(m.step(), Status::InvalidOperand);
        assert_eq!(m.acc(), 0);
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn test_loadi_accepts_any_integer() {
        let mut m = machine("loadi -12\nloadi 0");
        assert_eq!(m.step(), Status::Continue);
        assert_eq!(m.acc(), -12);
        assert_eq!(m.step(), Status::Continue);
        assert_eq!(m.acc(), 0);
    }

    #[test]
    fn test_hold_ignores_operand() {
        let mut m = machine("hold 1.5");
        assert_eq!(m.step(), Status::Halted);
    }

    #[test]
    fn test_arithmetic() {
        let mut m = machine(
            "loadi 6\nstore 1\nloadi 4\nstore 2\n\
             load 1\nadd 2\nstore 3\n\
             load 1\nsub 2\nstore 4\n\
             load 1\nmul 2\nstore 5\n\
             load 1\ndiv 2\nstore 6\nhold",
        );
        let outcome = m.run_limited(100);
        assert_eq!(outcome.status, Status::Halted);
        assert_eq!(m.register(3), 10);
        assert_eq!(m.register(4), 2);
        assert_eq!(m.register(5), 24);
        assert_eq!(m.register(6), 1);
    }

    #[test]
    fn test_division_truncates_toward_zero() {
        let mut m = machine("loadi 2\nstore 1\nloadi -7\ndiv 1");
        m.run_limited(4);
        assert_eq!(m.acc(), -3);
    }

    #[test]
    fn test_division_by_zero_is_invalid() {
        let mut m = machine("loadi 9\ndiv 1");
        m.step();
        assert_eq!(m.step(), Status::InvalidOperand);
        assert_eq!(m.acc(), 9);
        assert_eq!(m.pc(), 1);
    }

    #[test]
    fn test_division_overflow_is_invalid() {
        let mut m = machine("loadi -1\nstore 1\nloadi -4611686018427387904\nstore 2\nadd 2\ndiv 1");
        assert_eq!(m.run_limited(5).status, Status::Continue);
        assert_eq!(m.acc(), i64::MIN);
        assert_eq!(m.step(), Status::InvalidOperand);
        assert_eq!(m.acc(), i64::MIN);
        assert_eq!(m.last_status(), Status::InvalidOperand);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let mut m = machine("loadi 4611686018427387904\nstore 1\nloadi 2\nmul 1");
        assert_eq!(m.run_limited(4).status, Status::Continue);
        assert_eq!(m.acc(), i64::MIN);
    }

    #[test]
    fn test_indirect_load_store() {
        let mut m = machine(include_str!("../../demos/pointer.ram"));
        let outcome = m.run_limited(100);
        assert_eq!(outcome.status, Status::Halted);
        assert_eq!(m.register(10), 42);
        assert_eq!(m.register(11), 43);
        assert_eq!(m.acc(), 42);
    }

    #[test]
    fn test_indirect_negative_address_is_invalid() {
        let mut m = machine("loadi -1\nstore 1\nloadind 1");
        m.run_limited(2);
        assert_eq!(m.step(), Status::InvalidOperand);
        assert_eq!(m.acc(), -1);
    }

    #[test]
    fn test_indirect_read_past_end_is_zero() {
        let mut m = machine("loadi 1000\nstore 1\nloadind 1");
        assert_eq!(m.run_limited(3).status, Status::Continue);
        assert_eq!(m.acc(), 0);
    }

    #[test]
    fn test_write_past_end_is_invalid() {
        let mut m = machine("loadi 1\nstore 256");
        m.step();
        assert_eq!(m.step(), Status::InvalidOperand);

        let mut m = machine("loadi 300\nstore 1\nstoreind 1");
        m.run_limited(2);
        assert_eq!(m.step(), Status::InvalidOperand);
    }

    #[test]
    fn test_load_past_end_reads_zero() {
        let mut m = machine("loadi 4\nload 5000");
        m.step();
        assert_eq!(m.step(), Status::Continue);
        assert_eq!(m.acc(), 0);
    }

    #[test]
    fn test_conditional_jumps() {
        // (opcode, ACC, taken)
        let cases = [
            ("jeq", 0, true), ("jeq", 1, false),
            ("jge", 0, true), ("jge", 1, true), ("jge", -1, false),
            ("jle", 0, true), ("jle", -1, true), ("jle", 1, false),
            ("jgt", 1, true), ("jgt", 0, false),
            ("jlt", -1, true), ("jlt", 0, false),
        ];
        for (op, acc, taken) in cases {
            let mut m = machine(&format!("loadi {acc}\n{op} 7"));
            m.step();
            assert_eq!(m.step(), Status::Continue);
            let expected = if taken { 7 } else { 2 };
            assert_eq!(m.pc(), expected, "{op} with ACC={acc}");
        }
    }

    #[test]
    fn test_sum_demo() {
        let mut m = machine(include_str!("../../demos/sum.ram"));
        let outcome = m.run_limited(1000);
        assert_eq!(outcome, RunOutcome { status: Status::Halted, ticks: 42 });
        assert_eq!(m.register(2), 15);
        assert_eq!(m.register(1), 0);
        assert_eq!(m.cycles(), 41);
    }

    #[test]
    fn test_run_limited_stops_at_limit() {
        let mut m = machine("jmp 1\njmp 1");
        let outcome = m.run_limited(10);
        assert_eq!(outcome, RunOutcome { status: Status::Continue, ticks: 10 });
    }

    #[test]
    fn test_reset_after_halt() {
        let mut m = machine("loadi 5\nstore 1\nhold");
        m.run_limited(10);
        assert_eq!(m.last_status(), Status::Halted);

        m.reset();
        assert_eq!(m.pc(), 0);
        assert_eq!(m.acc(), 0);
        assert_eq!(m.register(1), 0);
        assert_eq!(m.last_status(), Status::Halted);
        assert_eq!(m.program().len(), 3);

        assert_eq!(m.step(), Status::Continue);
        assert_eq!(m.acc(), 5);
    }

    #[test]
    fn test_reset_keeps_registers_above_span() {
        let mut m = machine("loadi 8\nstore 99\nstore 100\nstore 255");
        m.run_limited(4);
        m.reset();
        assert_eq!(m.register(99), 0);
        assert_eq!(m.register(100), 8);
        assert_eq!(m.register(255), 8);
    }

    #[test]
    fn test_start_tick_stop() {
        let mut m = machine("loadi 1\nloadi 2\nhold");
        assert_eq!(m.tick(), None);

        m.start(50);
        assert!(m.is_running());
        assert_eq!(m.delay_ms(), 50);

        assert_eq!(m.tick(), Some(Status::Continue));
        assert_eq!(m.tick(), Some(Status::Continue));
        assert!(m.is_running());
        assert_eq!(m.tick(), Some(Status::Halted));
        assert!(!m.is_running());
        assert_eq!(m.last_status(), Status::Halted);
        assert_eq!(m.tick(), None);
    }

    #[test]
    fn test_run_stops_on_error() {
        let mut m = machine("loadi 1\nadd 0\nhold");
        m.start(10);
        m.tick();
        assert_eq!(m.tick(), Some(Status::InvalidOperand));
        assert!(!m.is_running());
        assert_eq!(m.last_status(), Status::InvalidOperand);
    }

    #[test]
    fn test_stopped_machine_does_not_tick() {
        let mut m = machine("loadi 1\nhold");
        m.start(10);
        m.stop();
        m.stop();
        assert!(!m.is_running());

        let before = m.clone();
        assert_eq!(m.tick(), None);
        assert_eq!(m.pc(), before.pc());
        assert_eq!(m.acc(), before.acc());
    }

    #[test]
    fn test_start_restarts_run() {
        let mut m = machine("jmp 1\njmp 1");
        m.start(100);
        m.start(20);
        assert!(m.is_running());
        assert_eq!(m.delay_ms(), 20);
    }

    #[test]
    fn test_reset_stops_run() {
        let mut m = machine("jmp 1\njmp 1");
        m.start(10);
        m.tick();
        m.reset();
        assert!(!m.is_running());
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn test_step_does_not_change_run_state() {
        let mut m = machine("loadi 1\nloadi 2\nhold");
        m.start(10);
        m.step();
        assert!(m.is_running());
        m.stop();
        m.step();
        assert!(!m.is_running());
    }

    #[test]
    fn test_load_rewinds_program_counter() {
        let mut m = machine("loadi 3\nstore 1\nhold");
        m.run_limited(2);
        m.load_source("load 1\nhold").unwrap();
        assert_eq!(m.pc(), 0);
        assert_eq!(m.register(1), 3);
        m.step();
        assert_eq!(m.acc(), 3);
    }

    #[test]
    fn test_bad_source_keeps_program() {
        let mut m = machine("loadi 3\nhold");
        let err = m.load_source("loadi 1\nnope").unwrap_err();
        assert_eq!(err.line(), 1);
        assert_eq!(m.program().len(), 2);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Continue.code(), 1);
        assert_eq!(Status::Halted.code(), 0);
        assert_eq!(Status::NoInstruction.code(), -1);
        assert_eq!(Status::InvalidOperand.code(), -2);
        assert_eq!(Status::from_code(-2), Some(Status::InvalidOperand));
        assert_eq!(Status::from_code(3), None);
        assert_eq!(serde_json::to_string(&Status::NoInstruction).unwrap(), "-1");
    }

    #[test]
    fn test_custom_config() {
        let config = MachineConfig { delay_ms: 5, register_count: 16, reset_span: 8 };
        let mut m = Machine::with_config(config);
        m.load_source("loadi 1\nstore 15\nstore 16").unwrap();
        assert_eq!(m.run_limited(10).status, Status::InvalidOperand);
        assert_eq!(m.register(15), 1);
        m.reset();
        assert_eq!(m.register(15), 1);
        assert_eq!(m.acc(), 0);
    }

    #[test]
    fn test_state_serializes() {
        let mut m = machine("loadi 2\nhold");
        m.step();
        let json: serde_json::Value = serde_json::to_value(&m).unwrap();
        assert_eq!(json["pc"], 1);
        assert_eq!(json["last_status"], 1);
        assert_eq!(json["program"][0]["opcode"], "loadi");
        assert_eq!(json["registers"]["cells"][0], 2);
    }
}
