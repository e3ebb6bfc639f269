//! WebAssembly bindings for the register machine.
//!
//! A browser page owns the timer: it calls [`WasmMachine::start`], then
//! [`WasmMachine::pump`] from `requestAnimationFrame` or `setInterval`, and
//! re-renders from the getters after every call.

use wasm_bindgen::prelude::*;
use crate::{parse, Machine};
use crate::asm::listing::listing;

/// Returned by `tick`/`pump` when no tick ran.
const NOT_RUNNING: i8 = 2;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    /// `Date.now()` of the last driver tick.
    last_tick_ms: f64,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with default settings.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            machine: Machine::new(),
            last_tick_ms: 0.0,
        }
    }

    /// Parse and load program text. Returns the instruction count.
    #[wasm_bindgen]
    pub fn load_source(&mut self, source: &str) -> Result<usize, JsError> {
        self.machine
            .load_source(source)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Step one instruction. Returns the status code.
    #[wasm_bindgen]
    pub fn step(&mut self) -> i8 {
        self.machine.step().code()
    }

    /// Begin a continuous run with `delay_ms` between ticks.
    #[wasm_bindgen]
    pub fn start(&mut self, delay_ms: u32) {
        self.machine.start(u64::from(delay_ms));
        self.last_tick_ms = js_sys::Date::now();
    }

    /// Run one tick now if running. Returns the status code, or 2 if the
    /// machine is not running.
    #[wasm_bindgen]
    pub fn tick(&mut self) -> i8 {
        match self.machine.tick() {
            Some(status) => {
                self.last_tick_ms = js_sys::Date::now();
                status.code()
            }
            None => NOT_RUNNING,
        }
    }

    /// Tick if the delay has elapsed since the last tick. Returns the status
    /// code, or 2 if nothing ran.
    #[wasm_bindgen]
    pub fn pump(&mut self) -> i8 {
        if !self.machine.is_running() {
            return NOT_RUNNING;
        }
        let now = js_sys::Date::now();
        if now - self.last_tick_ms < self.machine.delay_ms() as f64 {
            return NOT_RUNNING;
        }
        self.tick()
    }

    #[wasm_bindgen]
    pub fn stop(&mut self) {
        self.machine.stop();
    }

    /// Reset registers and program counter, keeping the program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.machine.is_running()
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.machine.pc()
    }

    /// Last status code.
    #[wasm_bindgen]
    pub fn status(&self) -> i8 {
        self.machine.last_status().code()
    }

    #[wasm_bindgen]
    pub fn accumulator(&self) -> i64 {
        self.machine.acc()
    }

    /// Get a register value (0 past the end).
    #[wasm_bindgen]
    pub fn register_at(&self, index: usize) -> i64 {
        self.machine.register(index)
    }

    /// All register values.
    #[wasm_bindgen]
    pub fn registers(&self) -> Vec<i64> {
        self.machine.registers().as_slice().to_vec()
    }

    #[wasm_bindgen]
    pub fn delay(&self) -> u32 {
        u32::try_from(self.machine.delay_ms()).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles()
    }

    /// Numbered listing of the loaded program.
    #[wasm_bindgen]
    pub fn listing(&self) -> String {
        listing(self.machine.program())
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.machine).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the first bad line in `source`, or -1 if it parses.
#[wasm_bindgen]
pub fn parse_error_line(source: &str) -> i32 {
    match parse(source) {
        Ok(_) => -1,
        Err(e) => i32::try_from(e.line()).unwrap_or(i32::MAX),
    }
}
