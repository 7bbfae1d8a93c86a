//! Trace sinks that consume `x86_core::dispatch::StepReport` without
//! owning the run loop: an instruction ring buffer, a call/return function
//! tracer, and an interrupt-event log. Grounded on `iringbuf.c` and
//! `ftrace.c`: same fixed-capacity, overwrite-oldest design, reimplemented
//! over owned `String`s instead of a static `char[128]` array.

use x86_core::interrupt::InterruptEvent;

/// Ring buffer capacity, matching `RINGBUF_SIZE` in the source.
pub const RING_CAPACITY: usize = 16;

/// Most-recent-instructions sink. `push` never blocks or fails; once full
/// it silently overwrites the oldest entry, exactly like the C ring.
#[derive(Debug, Default)]
pub struct InstructionRing {
    lines: Vec<String>,
    next: usize,
}

impl InstructionRing {
    #[must_use]
    pub fn new() -> Self {
        Self { lines: Vec::with_capacity(RING_CAPACITY), next: 0 }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() < RING_CAPACITY {
            self.lines.push(line);
        } else {
            self.lines[self.next] = line;
        }
        self.next = (self.next + 1) % RING_CAPACITY;
    }

    /// Entries oldest-to-newest, as `iringbuf_display` prints them starting
    /// from the write cursor and wrapping back around to it.
    #[must_use]
    pub fn entries(&self) -> Vec<&str> {
        if self.lines.len() < RING_CAPACITY {
            return self.lines.iter().map(String::as_str).collect();
        }
        (0..RING_CAPACITY)
            .map(|i| self.lines[(self.next + i) % RING_CAPACITY].as_str())
            .collect()
    }
}

/// Looks up a symbol name covering `addr`. `x86-loader`'s ELF symbol table
/// implements this; the no-op default below is what a loader-less session
/// gets, matching `find_symbol`'s `"???"` fallback.
pub trait SymbolResolver {
    fn resolve(&self, addr: u32) -> &str;
}

/// Always reports `"???"`, as `find_symbol` does before any symbols are
/// loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn resolve(&self, _addr: u32) -> &str {
        "???"
    }
}

/// One call/return event, indentation already resolved against the
/// tracer's running call depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTraceEntry {
    pub pc: u32,
    pub depth: u32,
    pub is_call: bool,
    pub symbol: String,
    pub target: u32,
}

/// Tracks call depth across `CALL`/`RET` control transfers and renders
/// indented entries, the way `ftrace_write` threads a static `depth`
/// counter through every call.
#[derive(Debug, Default)]
pub struct FunctionTracer {
    depth: u32,
}

impl FunctionTracer {
    #[must_use]
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    pub fn on_call(&mut self, pc: u32, target: u32, symbols: &dyn SymbolResolver) -> FunctionTraceEntry {
        let entry = FunctionTraceEntry {
            pc,
            depth: self.depth,
            is_call: true,
            symbol: symbols.resolve(target).to_string(),
            target,
        };
        self.depth += 1;
        entry
    }

    pub fn on_ret(&mut self, pc: u32, symbols: &dyn SymbolResolver) -> FunctionTraceEntry {
        self.depth = self.depth.saturating_sub(1);
        FunctionTraceEntry {
            pc,
            depth: self.depth,
            is_call: false,
            symbol: symbols.resolve(pc).to_string(),
            target: pc,
        }
    }
}

impl FunctionTraceEntry {
    /// Renders as `ftrace_write`'s two formats, e.g. `"0x1000:   call [f@0x2000]"`
    /// or `"0x2010: ret  [f]"`.
    #[must_use]
    pub fn render(&self) -> String {
        let indent = " ".repeat((self.depth as usize) * 2);
        if self.is_call {
            format!("{:#x}: {}call [{}@{:#x}]", self.pc, indent, self.symbol, self.target)
        } else {
            format!("{:#x}: {}ret  [{}]", self.pc, indent, self.symbol)
        }
    }
}

/// Records interrupt entry/exit so a debugger can show "we are currently
/// inside handler N, entered from pc P" — the live counterpart of
/// `InterruptEvent`, which only describes a single transition.
#[derive(Debug, Default)]
pub struct EventTrace {
    log: Vec<InterruptEvent>,
}

impl EventTrace {
    #[must_use]
    pub fn new() -> Self {
        Self { log: Vec::new() }
    }

    pub fn record(&mut self, event: InterruptEvent) {
        self.log.push(event);
    }

    #[must_use]
    pub fn entries(&self) -> &[InterruptEvent] {
        &self.log
    }
}
