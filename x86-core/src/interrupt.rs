//! Interrupt gate lookup and the push/pop sequences for `INT`/`IRET`.

use crate::error::EmuError;
use crate::mem::Mmu;
use crate::regs::{EFlags, Idtr};

/// System-descriptor gate type values (the 4-bit `type` field of an
/// interrupt gate descriptor). Only these two are meaningful here: a trap
/// gate leaves IF untouched on entry, an interrupt gate clears it.
pub const GATE_INTERRUPT: u8 = 0xE;
pub const GATE_TRAP: u8 = 0xF;

#[derive(Debug, Clone, Copy)]
struct GateDesc {
    off_low: u16,
    selector: u16,
    gate_type: u8,
    present: bool,
    off_high: u16,
}

impl GateDesc {
    fn decode(word0: u32, word1: u32) -> Self {
        let off_low = word0 as u16;
        let selector = (word0 >> 16) as u16;
        let attrs = (word1 >> 8) & 0xff;
        Self {
            off_low,
            selector,
            gate_type: (attrs & 0xf) as u8,
            present: (attrs >> 7) & 1 != 0,
            off_high: (word1 >> 16) as u16,
        }
    }

    const fn target(self) -> u32 {
        (u32::from(self.off_high) << 16) | u32::from(self.off_low)
    }
}

/// Event-trace sentinel `IRET` reports in place of a vector number,
/// matching NEMU's `INTR_EMPTY`.
pub const INTR_EMPTY: i32 = -1;

/// One event-trace record: `(vector, return_pc, target_pc)` for entry,
/// `(INTR_EMPTY, return_pc, target_pc)` for `IRET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptEvent {
    pub vector: i32,
    pub return_pc: u32,
    pub target_pc: u32,
}

fn push32(esp: &mut u32, mmu: &mut impl Mmu, value: u32) -> Result<(), EmuError> {
    *esp = esp.wrapping_sub(4);
    mmu.write(*esp, 4, value)
}

fn pop32(esp: &mut u32, mmu: &mut impl Mmu) -> Result<u32, EmuError> {
    let value = mmu.read(*esp, 4)?;
    *esp = esp.wrapping_add(4);
    Ok(value)
}

/// Raises vector `no` with `return_pc` as the address to resume at.
/// Pushes EFLAGS, then CS, then `return_pc`; reads the 8-byte gate at
/// `idtr.base + no*8`; fails fatally if not present; clears IF only for
/// interrupt-gate type. Returns the target PC and the event-trace record.
pub fn raise_intr(
    no: u8,
    return_pc: u32,
    esp: &mut u32,
    cs: &mut u16,
    eflags: &mut EFlags,
    idtr: Idtr,
    mmu: &mut impl Mmu,
) -> Result<(u32, InterruptEvent), EmuError> {
    push32(esp, mmu, eflags.bits())?;
    push32(esp, mmu, u32::from(*cs))?;
    push32(esp, mmu, return_pc)?;

    let gate_addr = idtr.base + u32::from(no) * 8;
    let word0 = mmu.read(gate_addr, 4)?;
    let word1 = mmu.read(gate_addr + 4, 4)?;
    let gate = GateDesc::decode(word0, word1);

    if !gate.present {
        return Err(EmuError::MissingIdtEntry { vector: no });
    }

    let target = gate.target();
    *cs = gate.selector;
    if gate.gate_type == GATE_INTERRUPT {
        eflags.set_if(false);
    }

    Ok((
        target,
        InterruptEvent {
            vector: i32::from(no),
            return_pc,
            target_pc: target,
        },
    ))
}

/// `IRET`: pops `return_pc`, then CS, then the full EFLAGS word, in the
/// reverse order `raise_intr` pushed them.
pub fn iret(
    esp: &mut u32,
    cs: &mut u16,
    eflags: &mut EFlags,
    mmu: &mut impl Mmu,
) -> Result<(u32, InterruptEvent), EmuError> {
    let return_pc = pop32(esp, mmu)?;
    *cs = pop32(esp, mmu)? as u16;
    eflags.set_bits(pop32(esp, mmu)?);

    Ok((
        return_pc,
        InterruptEvent {
            vector: INTR_EMPTY,
            return_pc,
            target_pc: return_pc,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::PhysicalMemory;

    #[test]
    fn int_then_iret_restores_state_exactly() {
        let mut mem = PhysicalMemory::new(0x1000);
        // Trap gate (type 0xF) at vector 0x80, target 0x200, selector 8.
        let gate_addr = 0x500 + 0x80 * 8;
        let word0 = 0x0008_u32 << 16; // off_low=0, selector=8
        let word1 = (1 << 15) | (0xF << 8) | (0x0200 << 16); // present, trap gate, off_high
        mem.write(gate_addr, 4, word0).unwrap();
        mem.write(gate_addr + 4, 4, word1).unwrap();

        let mut esp = 0x900u32;
        let mut cs = 0x10u16;
        let mut eflags = EFlags::new();
        eflags.set_if(true);

        let (target, ev) = raise_intr(0x80, 0x100, &mut esp, &mut cs, &mut eflags, Idtr { base: 0x500, limit: 0xff }, &mut mem).unwrap();
        assert_eq!(target, 0x200);
        assert_eq!(cs, 8);
        assert!(eflags.if_(), "trap gate must not clear IF");
        assert_eq!(ev.vector, 0x80);

        let (return_pc, ev2) = iret(&mut esp, &mut cs, &mut eflags, &mut mem).unwrap();
        assert_eq!(return_pc, 0x100);
        assert_eq!(cs, 0x10);
        assert!(eflags.if_());
        assert_eq!(esp, 0x900);
        assert_eq!(ev2.vector, INTR_EMPTY);
    }

    #[test]
    fn interrupt_gate_clears_if() {
        let mut mem = PhysicalMemory::new(0x1000);
        let gate_addr = 0x500;
        let word0 = 0x0008_0000_u32 | 0x0050; // selector=8, off_low=0x50
        let word1 = (1 << 15) | (0xE << 8);
        mem.write(gate_addr, 4, word0).unwrap();
        mem.write(gate_addr + 4, 4, word1).unwrap();

        let mut esp = 0x900u32;
        let mut cs = 0x10u16;
        let mut eflags = EFlags::new();
        eflags.set_if(true);
        let (target, _) = raise_intr(0, 0x100, &mut esp, &mut cs, &mut eflags, Idtr { base: 0x500, limit: 0xff }, &mut mem).unwrap();
        assert_eq!(target, 0x50);
        assert!(!eflags.if_());
    }

    #[test]
    fn missing_gate_is_fatal() {
        let mut mem = PhysicalMemory::new(0x1000);
        let mut esp = 0x900u32;
        let mut cs = 0x10u16;
        let mut eflags = EFlags::new();
        let err = raise_intr(3, 0x100, &mut esp, &mut cs, &mut eflags, Idtr { base: 0x500, limit: 0xff }, &mut mem).unwrap_err();
        assert_eq!(err, EmuError::MissingIdtEntry { vector: 3 });
    }
}
