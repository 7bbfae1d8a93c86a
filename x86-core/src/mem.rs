//! Flat physical memory with dispatch to memory-mapped device windows, and
//! the port I/O bus devices are reached through for `IN`/`OUT`.

use crate::error::EmuError;

/// A memory-mapped device window: reads and writes arrive with an offset
/// already relative to the window's base, not an absolute address.
pub trait DeviceWindow {
    fn read(&mut self, offset: u32, n: u8) -> u32;
    fn write(&mut self, offset: u32, n: u8, value: u32);
}

/// Virtual-to-physical translation. This core maps identically (no paging),
/// so the only job left is dispatching addresses that fall inside a
/// registered device window.
pub trait Mmu {
    /// Read `n` (1, 2 or 4) bytes starting at `vaddr`, little-endian,
    /// zero-extended into the returned word.
    fn read(&mut self, vaddr: u32, n: u8) -> Result<u32, EmuError>;
    fn write(&mut self, vaddr: u32, n: u8, value: u32) -> Result<(), EmuError>;
}

/// Port I/O bus for `IN`/`OUT`. Unmapped ports read as zero and silently
/// discard writes, per the external-interfaces contract.
pub trait PortBus {
    fn port_read(&mut self, port: u16, n: u8) -> u32;
    fn port_write(&mut self, port: u16, n: u8, value: u32);
}

/// A `PortBus` that implements no devices at all: every read is zero, every
/// write is dropped. Useful for tests and for embedding the core without
/// wiring up `x86-devices`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPortBus;

impl PortBus for NullPortBus {
    fn port_read(&mut self, _port: u16, _n: u8) -> u32 {
        0
    }
    fn port_write(&mut self, _port: u16, _n: u8, _value: u32) {}
}

struct Window {
    base: u32,
    size: u32,
    device: Box<dyn DeviceWindow>,
}

/// A byte-addressed RAM array plus zero or more device windows registered
/// at fixed base addresses. Addresses inside `0..ram.len()` and not
/// shadowed by a device window hit RAM; everything else dispatches to
/// whichever window claims it, or is a fatal unmapped-memory access.
pub struct PhysicalMemory {
    ram: Vec<u8>,
    windows: Vec<Window>,
}

impl PhysicalMemory {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            ram: vec![0; size],
            windows: Vec::new(),
        }
    }

    /// Load `image` at physical address `at`, typically the reset vector.
    ///
    /// # Panics
    /// Panics if the image does not fit inside the configured RAM size.
    pub fn load_image(&mut self, at: u32, image: &[u8]) {
        let start = at as usize;
        let end = start + image.len();
        assert!(end <= self.ram.len(), "reset image does not fit in RAM");
        self.ram[start..end].copy_from_slice(image);
    }

    pub fn register_window(&mut self, base: u32, size: u32, device: Box<dyn DeviceWindow>) {
        self.windows.push(Window { base, size, device });
    }

    fn find_window(&mut self, vaddr: u32) -> Option<(&mut Window, u32)> {
        self.windows
            .iter_mut()
            .find(|w| vaddr >= w.base && vaddr < w.base + w.size)
            .map(|w| {
                let offset = vaddr - w.base;
                (w, offset)
            })
    }
}

impl Mmu for PhysicalMemory {
    fn read(&mut self, vaddr: u32, n: u8) -> Result<u32, EmuError> {
        if let Some((window, offset)) = self.find_window(vaddr) {
            return Ok(window.device.read(offset, n));
        }
        let start = vaddr as usize;
        let end = start + n as usize;
        if end > self.ram.len() {
            return Err(EmuError::UnmappedMemory { addr: vaddr });
        }
        let mut value = 0u32;
        for (i, byte) in self.ram[start..end].iter().enumerate() {
            value |= u32::from(*byte) << (8 * i);
        }
        Ok(value)
    }

    fn write(&mut self, vaddr: u32, n: u8, value: u32) -> Result<(), EmuError> {
        if let Some((window, offset)) = self.find_window(vaddr) {
            window.device.write(offset, n, value);
            return Ok(());
        }
        let start = vaddr as usize;
        let end = start + n as usize;
        if end > self.ram.len() {
            return Err(EmuError::UnmappedMemory { addr: vaddr });
        }
        for (i, slot) in self.ram[start..end].iter_mut().enumerate() {
            *slot = (value >> (8 * i)) as u8;
        }
        Ok(())
    }
}

impl crate::traits::MemoryRead for PhysicalMemory {
    fn read_mem(&mut self, vaddr: u32, n: u8) -> Result<u32, EmuError> {
        Mmu::read(self, vaddr, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_widths() {
        let mut mem = PhysicalMemory::new(0x1000);
        mem.write(0x10, 4, 0xdead_beef).unwrap();
        assert_eq!(mem.read(0x10, 4).unwrap(), 0xdead_beef);
        assert_eq!(mem.read(0x10, 2).unwrap(), 0xbeef);
        assert_eq!(mem.read(0x10, 1).unwrap(), 0xef);
    }

    #[test]
    fn out_of_range_is_unmapped() {
        let mut mem = PhysicalMemory::new(0x10);
        assert!(matches!(
            mem.read(0x100, 4),
            Err(EmuError::UnmappedMemory { addr: 0x100 })
        ));
    }

    struct Doubler;
    impl DeviceWindow for Doubler {
        fn read(&mut self, offset: u32, _n: u8) -> u32 {
            offset * 2
        }
        fn write(&mut self, _offset: u32, _n: u8, _value: u32) {}
    }

    #[test]
    fn device_window_shadows_ram() {
        let mut mem = PhysicalMemory::new(0x1000);
        mem.register_window(0x800, 0x10, Box::new(Doubler));
        assert_eq!(mem.read(0x805, 1).unwrap(), 10);
    }
}
