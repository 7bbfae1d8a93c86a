//! Keyboard event port: a 32-bit code per key transition (top bit set for
//! key-down, scancode in the low bits), fed from a queue the front end
//! pushes into — the AM `AM_INPUT_KEYBRD` read in `events_read` reworked
//! as an explicit push/pop queue instead of a polled global.

use std::collections::VecDeque;

use x86_core::mem::DeviceWindow;

pub const KEY_DOWN_BIT: u32 = 1 << 31;

/// One key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scancode: u16,
    pub down: bool,
}

impl KeyEvent {
    #[must_use]
    pub fn encode(self) -> u32 {
        u32::from(self.scancode) | if self.down { KEY_DOWN_BIT } else { 0 }
    }
}

/// A port that pops the oldest queued event on every read; with nothing
/// queued it reads as all-zero scancode/key-up, matching `AM_KEY_NONE`.
#[derive(Debug, Default)]
pub struct KeyboardPort {
    pending: VecDeque<KeyEvent>,
}

impl KeyboardPort {
    #[must_use]
    pub fn new() -> Self {
        Self { pending: VecDeque::new() }
    }

    pub fn push_event(&mut self, event: KeyEvent) {
        self.pending.push_back(event);
    }
}

impl DeviceWindow for KeyboardPort {
    fn read(&mut self, _offset: u32, _n: u8) -> u32 {
        self.pending.pop_front().map_or(0, KeyEvent::encode)
    }

    fn write(&mut self, _offset: u32, _n: u8, _value: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_drain_in_fifo_order() {
        let mut kb = KeyboardPort::new();
        kb.push_event(KeyEvent { scancode: 0x1e, down: true }); // 'a' down
        kb.push_event(KeyEvent { scancode: 0x1e, down: false });

        let first = kb.read(0, 4);
        assert_eq!(first & KEY_DOWN_BIT, KEY_DOWN_BIT);
        assert_eq!(first & 0xffff, 0x1e);

        let second = kb.read(0, 4);
        assert_eq!(second & KEY_DOWN_BIT, 0);
    }

    #[test]
    fn empty_queue_reads_as_no_key() {
        let mut kb = KeyboardPort::new();
        assert_eq!(kb.read(0, 4), 0);
    }
}
