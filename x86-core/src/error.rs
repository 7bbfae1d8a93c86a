//! Fatal-halt taxonomy. Every variant carries enough to print a useful
//! diagnostic and corresponds to one row of the error taxonomy: there is
//! deliberately no "catch and continue" path inside the run-loop.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmuError {
    #[error("invalid instruction at pc={pc:#010x}")]
    InvalidInstruction { pc: u32 },

    #[error("divide by zero at pc={pc:#010x}")]
    DivideByZero { pc: u32 },

    #[error("unmapped memory access at address={addr:#010x}")]
    UnmappedMemory { addr: u32 },

    #[error("IDT entry for vector {vector} is not present")]
    MissingIdtEntry { vector: u8 },
}
