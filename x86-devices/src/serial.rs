//! Single byte-wide serial port. Writes flush to the configured sink
//! immediately, mirroring `serial_write`'s `putch`-per-byte loop.

use x86_core::mem::DeviceWindow;

/// Anything a byte can be written to — `Stdout` in a real CLI run, a
/// `Vec<u8>` in tests.
pub trait SerialSink {
    fn write_byte(&mut self, byte: u8);
}

impl SerialSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// Stdout-backed sink for a running emulator.
#[derive(Debug, Default)]
pub struct Stdout;

impl SerialSink for Stdout {
    fn write_byte(&mut self, byte: u8) {
        use std::io::Write;
        let _ = std::io::stdout().write_all(&[byte]);
    }
}

/// A one-byte-wide device window: only the low byte of any write is
/// meaningful, matching the port's single-character semantics. Reads
/// always return 0 — this is a write-only port.
pub struct SerialPort<S> {
    sink: S,
}

impl<S: SerialSink> SerialPort<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: SerialSink> DeviceWindow for SerialPort<S> {
    fn read(&mut self, _offset: u32, _n: u8) -> u32 {
        0
    }

    fn write(&mut self, _offset: u32, _n: u8, value: u32) {
        self.sink.write_byte(value as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_flush_the_low_byte_immediately() {
        let mut port = SerialPort::new(Vec::new());
        port.write(0, 1, u32::from(b'A'));
        port.write(0, 1, u32::from(b'B'));
        assert_eq!(port.sink, vec![b'A', b'B']);
    }
}
