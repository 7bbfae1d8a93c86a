//! Flat binary loading: the common case where an image is just bytes
//! meant to land at the reset vector, no section headers involved.

use x86_core::mem::PhysicalMemory;

/// Loads `image` at physical address `at`. A thin, named wrapper around
/// `PhysicalMemory::load_image` so the CLI's load path reads the same
/// regardless of which loader it picked.
///
/// # Panics
/// Panics if the image does not fit inside the configured RAM size.
pub fn load_flat(mem: &mut PhysicalMemory, at: u32, image: &[u8]) {
    mem.load_image(at, image);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_bytes_verbatim_at_the_requested_address() {
        use x86_core::mem::Mmu;
        let mut mem = PhysicalMemory::new(0x100);
        load_flat(&mut mem, 0x10, &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(mem.read(0x10, 4).unwrap(), 0xefbe_adde);
    }
}
