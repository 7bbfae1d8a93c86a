//! The narrow read-only seam `x86-dbg` depends on. Its expression engine
//! and watchpoint manager are generic over these two traits rather than
//! over the concrete `Emulator`, so the debugger crate never needs to know
//! about decode internals, the port bus, or the dispatcher.

use crate::error::EmuError;
use crate::regs::Width;

/// Read-only access to the general-purpose register file.
pub trait RegisterRead {
    fn read_reg(&self, idx: u8, width: Width) -> u32;

    /// Resolves a register name (`"eax"`, `"ax"`, `"al"`, ...) to its
    /// current value, or `None` if the name is not a register.
    fn read_reg_named(&self, name: &str) -> Option<u32> {
        crate::regs::lookup_name(name).map(|(idx, width)| self.read_reg(idx, width))
    }
}

/// Read access to the address space, for the expression engine's
/// `*expr` dereference operator and for inspecting watchpoint operands.
pub trait MemoryRead {
    fn read_mem(&mut self, vaddr: u32, n: u8) -> Result<u32, EmuError>;
}
