//! Debugger application state and logic.

use crate::{Machine, Program, Status, Ticker};
use std::time::{Duration, Instant};

/// Smallest and largest tick delays reachable with `+`/`-`.
const MIN_DELAY_MS: u64 = 10;
const MAX_DELAY_MS: u64 = 5_000;

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub machine: Machine,
    /// Schedules ticks while the machine is running.
    pub ticker: Ticker,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Register view scroll offset.
    pub reg_scroll: usize,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(mut machine: Machine, program: Program) -> Self {
        machine.load(program);
        let ticker = Ticker::from_millis(machine.delay_ms(), Instant::now());

        Self {
            machine,
            ticker,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            reg_scroll: 0,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.machine.pc();
        let status = self.machine.step();
        self.report(pc, status);
    }

    /// Start a continuous run at the machine's delay.
    pub fn run(&mut self) {
        let delay = self.machine.delay_ms();
        self.machine.start(delay);
        self.ticker.restart(Instant::now());
        self.status = format!("Running every {} ms...", delay);
    }

    /// Stop a continuous run.
    pub fn pause(&mut self) {
        self.machine.stop();
        self.status = "Paused.".into();
    }

    /// Run one tick of continuous execution if one is due.
    pub fn tick(&mut self, now: Instant) {
        if !self.machine.is_running() || !self.ticker.poll(now) {
            return;
        }

        let pc = self.machine.pc();
        if let Some(status) = self.machine.tick() {
            self.report(pc, status);
        }
    }

    /// Halve or double the delay. A run in progress continues at the new
    /// rate.
    pub fn scale_delay(&mut self, faster: bool) {
        let current = self.machine.delay_ms();
        let delay = if faster { current / 2 } else { current.saturating_mul(2) };
        let delay = delay.clamp(MIN_DELAY_MS, MAX_DELAY_MS);

        self.machine.set_delay_ms(delay);
        self.ticker
            .set_interval(Duration::from_millis(delay), Instant::now());
        self.status = format!("Delay: {} ms", delay);
    }

    /// Reset the machine, keeping the program.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.status = "Reset. Ready.".into();
    }

    fn report(&mut self, pc: usize, status: Status) {
        let instr = self
            .machine
            .program()
            .get(pc)
            .map(|i| i.to_string())
            .unwrap_or_else(|| "---".into());

        self.status = match status {
            Status::Continue => format!("{:03}: {}", pc, instr),
            Status::Halted => format!("Halted at {:03} after {} cycles", pc, self.machine.cycles()),
            Status::NoInstruction => format!("Error: no instruction at {}", pc),
            Status::InvalidOperand => format!("Error: invalid operand at {:03}: {}", pc, instr),
        };
    }

    /// Program listing: `(index, text, is_current)` for the instructions
    /// around the program counter.
    pub fn get_listing(&self, lines: usize) -> Vec<(usize, String, bool)> {
        let pc = self.machine.pc();
        let start = pc.saturating_sub(lines / 2);

        self.machine
            .program()
            .iter()
            .enumerate()
            .skip(start)
            .take(lines)
            .map(|(index, instr)| (index, instr.to_string(), index == pc))
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(machine: Machine, program: Program) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(machine, program);

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Wait for input, but never past the next due tick
        let timeout = if app.machine.is_running() {
            app.ticker.remaining(Instant::now()).min(Duration::from_millis(50))
        } else {
            Duration::from_millis(50)
        };

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => app.step(),
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('+') => app.scale_delay(true),
                        KeyCode::Char('-') => app.scale_delay(false),
                        KeyCode::Up => {
                            app.reg_scroll = app.reg_scroll.saturating_sub(1);
                        }
                        KeyCode::Down => {
                            if app.reg_scroll + 1 < app.machine.registers().len() {
                                app.reg_scroll += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
