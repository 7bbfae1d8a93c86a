//! Fixed-pool watchpoint manager: a free list and an active list sharing
//! one backing array of `N` slots, exactly as `watchpoint.c`'s `wp_pool`.
//! Unlike the source's global singly linked lists threaded through raw
//! pointers, slots here are addressed by index into a `Vec`, so "next"
//! links are `Option<usize>` rather than pointers.

use thiserror::Error;
use x86_core::{MemoryRead, RegisterRead};

use crate::expr::{self, ExprError};

/// Pool capacity, matching `#define NR_WP 32` in the source.
pub const CAPACITY: usize = 32;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum WatchpointError {
    #[error("no free watchpoint slots available")]
    PoolExhausted,
    #[error("invalid expression: {0}")]
    InvalidExpression(#[from] ExprError),
    #[error("no watchpoint numbered {0}")]
    NotFound(usize),
}

struct Slot {
    expr: String,
    old_value: u32,
    next: Option<usize>,
}

/// One reported change: which watchpoint fired and its old/new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    pub number: usize,
    pub old_value: u32,
    pub new_value: u32,
}

/// The `N`-slot pool plus the two intrusive lists threaded through it.
/// `slots[i]` is live data only while `i` is reachable from `active_head`;
/// while on the free list its contents are stale and ignored.
pub struct WatchpointManager {
    slots: Vec<Slot>,
    active_head: Option<usize>,
    free_head: Option<usize>,
}

impl Default for WatchpointManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchpointManager {
    #[must_use]
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(CAPACITY);
        for i in 0..CAPACITY {
            slots.push(Slot {
                expr: String::new(),
                old_value: 0,
                next: if i + 1 == CAPACITY { None } else { Some(i + 1) },
            });
        }
        Self {
            slots,
            active_head: None,
            free_head: Some(0),
        }
    }

    /// Evaluates `expr` once; on success takes the free-list head, stores
    /// the expression and initial value, and links it onto the active
    /// list. Returns the watchpoint's number (its pool index).
    pub fn set(
        &mut self,
        expr: &str,
        regs: &impl RegisterRead,
        mem: &mut impl MemoryRead,
    ) -> Result<usize, WatchpointError> {
        let value = expr::evaluate(expr, regs, mem)?;
        let idx = self.free_head.ok_or(WatchpointError::PoolExhausted)?;
        self.free_head = self.slots[idx].next;
        self.slots[idx].expr = expr.to_string();
        self.slots[idx].old_value = value;
        self.slots[idx].next = self.active_head;
        self.active_head = Some(idx);
        Ok(idx)
    }

    /// Unlinks watchpoint `number` from the active list and returns it to
    /// the free list's head.
    pub fn delete(&mut self, number: usize) -> Result<(), WatchpointError> {
        let mut prev: Option<usize> = None;
        let mut cur = self.active_head;
        while let Some(idx) = cur {
            if idx == number {
                match prev {
                    Some(p) => self.slots[p].next = self.slots[idx].next,
                    None => self.active_head = self.slots[idx].next,
                }
                self.slots[idx].next = self.free_head;
                self.free_head = Some(idx);
                return Ok(());
            }
            prev = Some(idx);
            cur = self.slots[idx].next;
        }
        Err(WatchpointError::NotFound(number))
    }

    /// Active watchpoints as `(number, expr, old_value)`, in list order
    /// (most-recently-created first, matching `new_wp`'s head insertion).
    #[must_use]
    pub fn list(&self) -> Vec<(usize, &str, u32)> {
        let mut out = Vec::new();
        let mut cur = self.active_head;
        while let Some(idx) = cur {
            out.push((idx, self.slots[idx].expr.as_str(), self.slots[idx].old_value));
            cur = self.slots[idx].next;
        }
        out
    }

    /// Walks the active list, re-evaluating each expression. Returns the
    /// first whose value changed, updating its stored `old_value` and
    /// leaving the rest untouched — callers should call `scan` once per
    /// instruction boundary and treat `Some` as a request to pause.
    pub fn scan(
        &mut self,
        regs: &impl RegisterRead,
        mem: &mut impl MemoryRead,
    ) -> Option<Change> {
        let mut cur = self.active_head;
        while let Some(idx) = cur {
            if let Ok(new_value) = expr::evaluate(&self.slots[idx].expr, regs, mem) {
                if new_value != self.slots[idx].old_value {
                    let old_value = self.slots[idx].old_value;
                    self.slots[idx].old_value = new_value;
                    tracing::debug!(number = idx, old_value, new_value, "watchpoint changed");
                    return Some(Change { number: idx, old_value, new_value });
                }
            }
            cur = self.slots[idx].next;
        }
        None
    }

    /// Total number of slots reachable from either list — should always
    /// equal `CAPACITY`, and both lists should be acyclic.
    #[cfg(test)]
    fn live_count(&self) -> usize {
        let mut count = 0;
        let mut seen = vec![false; CAPACITY];
        for mut cur in [self.active_head, self.free_head] {
            while let Some(idx) = cur {
                assert!(!seen[idx], "cycle or duplicate in watchpoint lists");
                seen[idx] = true;
                count += 1;
                cur = self.slots[idx].next;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x86_core::mem::PhysicalMemory;
    use x86_core::regs::{Registers, Width};

    struct FakeRegs(Registers);
    impl RegisterRead for FakeRegs {
        fn read_reg(&self, idx: u8, width: Width) -> u32 {
            self.0.read(idx, width)
        }
    }

    #[test]
    fn pool_invariant_holds_across_set_and_delete() {
        let mut wm = WatchpointManager::new();
        let regs = FakeRegs(Registers::new());
        let mut mem = PhysicalMemory::new(0x10);
        assert_eq!(wm.live_count(), CAPACITY);

        let a = wm.set("1", &regs, &mut mem).unwrap();
        let b = wm.set("2", &regs, &mut mem).unwrap();
        assert_eq!(wm.live_count(), CAPACITY);

        wm.delete(a).unwrap();
        assert_eq!(wm.live_count(), CAPACITY);
        assert!(wm.delete(a).is_err());

        wm.delete(b).unwrap();
        assert_eq!(wm.live_count(), CAPACITY);
    }

    #[test]
    fn exhausting_the_pool_is_a_diagnostic_not_a_panic() {
        let mut wm = WatchpointManager::new();
        let regs = FakeRegs(Registers::new());
        let mut mem = PhysicalMemory::new(0x10);
        for _ in 0..CAPACITY {
            wm.set("1", &regs, &mut mem).unwrap();
        }
        assert_eq!(
            wm.set("1", &regs, &mut mem),
            Err(WatchpointError::PoolExhausted)
        );
    }

    #[test]
    fn scan_reports_change_exactly_on_third_write() {
        let mut wm = WatchpointManager::new();
        let mut gpr = Registers::new();
        let mut mem = PhysicalMemory::new(0x10);

        gpr.write(x86_core::regs::EAX, Width::Dword, 1);
        let regs = FakeRegs(gpr);
        wm.set("$eax", &regs, &mut mem).unwrap();

        // mov eax, 1 (no change)
        assert!(wm.scan(&regs, &mut mem).is_none());

        // mov eax, 2
        let mut gpr2 = Registers::new();
        gpr2.write(x86_core::regs::EAX, Width::Dword, 2);
        let regs2 = FakeRegs(gpr2);
        let change = wm.scan(&regs2, &mut mem).unwrap();
        assert_eq!(change.old_value, 1);
        assert_eq!(change.new_value, 2);
    }
}
