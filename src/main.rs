//! RAM Emulator - CLI Entry Point
//!
//! Commands:
//! - `ram-emu run <program>` - Run a program until it halts
//! - `ram-emu debug <program>` - Interactive debugger
//! - `ram-emu check <program>` - Parse a program and report errors
//! - `ram-emu list <program>` - Print a numbered listing
//! - `ram-emu opcodes` - Describe the instruction set

use clap::{Args, Parser, Subcommand};
use ram::{Machine, MachineConfig, Opcode, Program, Status};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ram-emu")]
#[command(version)]
#[command(about = "A step-by-step interpreter for an accumulator-based register machine")]
struct Cli {
    /// Log every executed tick
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or faults
    Run {
        /// Path to the program file
        program: String,
        /// Maximum number of ticks to run
        #[arg(short, long, default_value = "10000")]
        max_ticks: u64,
        /// Print each instruction as it executes
        #[arg(short, long)]
        trace: bool,
        /// Print the final machine state as JSON
        #[arg(long)]
        json: bool,
        /// Wait the configured delay between ticks
        #[arg(long)]
        realtime: bool,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the program file
        program: String,
        #[command(flatten)]
        machine: MachineArgs,
    },
    /// Parse a program and report the first error
    Check {
        /// Path to the program file
        program: String,
    },
    /// Print a numbered listing of a program
    List {
        /// Path to the program file
        program: String,
    },
    /// Describe every opcode
    Opcodes,
}

#[derive(Args)]
struct MachineArgs {
    /// JSON machine configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Delay between ticks in milliseconds (overrides the config file)
    #[arg(short, long)]
    delay: Option<u64>,
}

fn main() {
    let cli = Cli::parse();

    // The debugger owns the terminal, so it gets no log output.
    #[cfg(feature = "tui")]
    let wants_logs = !matches!(cli.command, Some(Commands::Debug { .. }));
    #[cfg(not(feature = "tui"))]
    let wants_logs = true;

    if wants_logs {
        init_logging(cli.verbose);
    }

    match cli.command {
        Some(Commands::Run { program, max_ticks, trace, json, realtime, machine }) => {
            run_program(&program, &machine, max_ticks, trace, json, realtime);
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { program, machine }) => {
            debug_program(&program, &machine);
        }
        Some(Commands::Check { program }) => {
            check_program(&program);
        }
        Some(Commands::List { program }) => {
            list_program(&program);
        }
        Some(Commands::Opcodes) => {
            print_opcodes();
        }
        None => {
            println!("RAM Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("An accumulator-based register machine");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and parse a program file, exiting on failure.
fn load_program(path: &str) -> Program {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    match ram::parse(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("❌ Parse error in {}: {} (line index {})", path, e, e.line());
            if let Some(text) = source.split('\n').nth(e.line()) {
                eprintln!("   {} | {}", e.line() + 1, text.trim_end());
            }
            std::process::exit(1);
        }
    }
}

/// Build a machine from `--config` and `--delay`, exiting on a bad config.
fn build_machine(args: &MachineArgs) -> Machine {
    let mut config = match &args.config {
        Some(path) => match MachineConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => MachineConfig::default(),
    };

    if let Some(delay) = args.delay {
        config.delay_ms = delay;
    }

    Machine::with_config(config)
}

fn run_program(
    path: &str,
    args: &MachineArgs,
    max_ticks: u64,
    trace: bool,
    json: bool,
    realtime: bool,
) {
    use ram::Ticker;
    use std::time::Instant;

    let program = load_program(path);
    if !json {
        println!("🔧 Running: {} ({} instructions)", path, program.len());
    }

    let mut machine = build_machine(args);
    machine.load(program);

    let mut ticks = 0u64;
    let mut status = Status::Continue;

    if realtime {
        // Drive the machine the way an interactive host would.
        machine.start(machine.delay_ms());
        let mut ticker = Ticker::from_millis(machine.delay_ms(), Instant::now());

        while machine.is_running() && ticks < max_ticks {
            std::thread::sleep(ticker.remaining(Instant::now()));
            if !ticker.poll(Instant::now()) {
                continue;
            }
            let pc = machine.pc();
            if let Some(s) = machine.tick() {
                status = s;
                ticks += 1;
                if trace && s.is_continue() {
                    print_trace(&machine, pc);
                }
            }
        }
        machine.stop();
    } else {
        while ticks < max_ticks {
            let pc = machine.pc();
            status = machine.step();
            ticks += 1;
            if trace && status.is_continue() {
                print_trace(&machine, pc);
            }
            if !status.is_continue() {
                break;
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&machine) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!();
        println!("━━━ Result ━━━");
        println!("Ticks:  {}", ticks);
        println!("Status: {}", status);
        println!("PC:     {}", machine.pc());
        println!("ACC:    {}", machine.acc());
        for (index, value) in machine.registers().non_zero() {
            if index != 0 {
                println!("R{:03}:   {}", index, value);
            }
        }

        if status.is_continue() {
            println!();
            println!("⚠️  Reached tick limit ({}). Use --max-ticks to increase.", max_ticks);
        }
    }

    if status.is_error() {
        std::process::exit(1);
    }
}

fn print_trace(machine: &Machine, pc: usize) {
    let instr = machine
        .program()
        .get(pc)
        .map(|i| i.to_string())
        .unwrap_or_default();
    println!("{:03}: {:<16} ACC={}", pc, instr, machine.acc());
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, args: &MachineArgs) {
    use ram::tui::run_debugger;

    let program = load_program(path);
    let machine = build_machine(args);

    if let Err(e) = run_debugger(machine, program) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

fn check_program(path: &str) {
    let program = load_program(path);
    println!("✓ {}: {} instructions", path, program.len());
}

fn list_program(path: &str) {
    let program = load_program(path);
    print!("{}", ram::listing(&program));
}

fn print_opcodes() {
    for op in Opcode::ALL {
        let usage = if op.requires_operand() {
            format!("{} x", op)
        } else {
            op.to_string()
        };
        println!("{:<12} {}", usage, op.description());
    }
}
