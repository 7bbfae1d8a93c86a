//! End-to-end watchpoint scenario driven against a real `x86_core::Emulator`
//! instead of a fake register file, exercising the pool and the expression
//! engine together the way a debugger front end would.

use x86_core::mem::{NullPortBus, PhysicalMemory};
use x86_core::Emulator;
use x86_dbg::WatchpointManager;

#[test]
fn watchpoint_on_eax_fires_exactly_on_the_third_mov() {
    // mov eax, 1 ; [watch armed here, baseline = 1] ; mov eax, 1 ; mov eax, 1 ; mov eax, 2 ; int3
    let image = [
        0xB8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1 (establishes baseline)
        0xB8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1 (1st of three, no change)
        0xB8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1 (2nd of three, no change)
        0xB8, 0x02, 0x00, 0x00, 0x00, // mov eax, 2 (3rd of three, changes)
        0xCC,
    ];
    let mut mem = PhysicalMemory::new(0x1000);
    mem.load_image(0, &image);
    let mut emu = Emulator::new(mem, NullPortBus, 0, 0x800);

    emu.step().unwrap(); // run the baseline mov first

    let mut watchpoints = WatchpointManager::new();
    watchpoints.set("$eax", &emu.cpu.regs, &mut emu.mmu).unwrap();

    let mut fired_after = None;
    for i in 0..3 {
        emu.step().unwrap();
        if let Some(change) = watchpoints.scan(&emu.cpu.regs, &mut emu.mmu) {
            fired_after = Some((i, change));
            break;
        }
    }

    let (index, change) = fired_after.expect("watchpoint should have fired");
    assert_eq!(index, 2, "eax only changes on the third of the three movs");
    assert_eq!(change.old_value, 1);
    assert_eq!(change.new_value, 2);
}
