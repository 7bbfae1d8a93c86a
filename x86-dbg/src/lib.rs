//! Debugger-side support: the watchpoint expression language, the fixed
//! watchpoint pool, and the trace sinks (instruction ring, function
//! tracer, event log) a REPL layers on top of the core.
//!
//! Everything here is generic over `x86_core::{RegisterRead, MemoryRead}`
//! rather than over the concrete `Emulator`, so this crate never needs to
//! know about decode internals, the port bus, or the dispatcher.

pub mod expr;
pub mod trace;
pub mod watchpoint;

pub use expr::{evaluate, ExprError};
pub use trace::{EventTrace, FunctionTraceEntry, FunctionTracer, InstructionRing, NoSymbols, SymbolResolver};
pub use watchpoint::{Change, WatchpointError, WatchpointManager};
