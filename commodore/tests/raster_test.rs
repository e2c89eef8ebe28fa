//! VIC-II raster timing, interrupts and bank selection on a running machine.

use std::cell::RefCell;
use std::rc::Rc;

use commodore::vic::{EVENT_RASTER_LINE, IRQ_RASTER, IRQ_SPRITE_SPRITE};
use commodore::{Cia, Region, Vic};
use lib8bit::{
    Chip, ChipId, Computer, InterruptId, Memory, MemoryBus, MemoryView, Mos6502, PhysicalStorage,
    PhysicalStorageSubset, SubsetId, ViewId,
};

const VIC: ChipId = ChipId(1);
const CIA2: ChipId = ChipId(3);

/// NOP-filled RAM with VIC registers at $D000-$D3FF and CIA2 at $DD00-$DDFF.
fn setup_memory() -> Memory {
    let mut image = vec![0xEA; 0x10000];
    image[0xFFFC] = 0x00;
    image[0xFFFD] = 0x80;

    let mut memory = Memory::new();
    let ram = memory.add_storage(PhysicalStorage::ram("RAM", 0x10000));
    memory
        .add_subset(
            PhysicalStorageSubset::window(SubsetId(0), "low", ram, 0, 0x0000, 0xD000)
                .with_default_data(image[..0xD000].to_vec()),
        )
        .unwrap();
    memory
        .add_subset(PhysicalStorageSubset::registers(SubsetId(1), "VIC", 0xD000, 0x400))
        .unwrap();
    memory
        .add_subset(PhysicalStorageSubset::window(SubsetId(2), "middle", ram, 0xD400, 0xD400, 0x900))
        .unwrap();
    memory
        .add_subset(PhysicalStorageSubset::registers(SubsetId(3), "CIA2", 0xDD00, 0x100))
        .unwrap();
    memory
        .add_subset(
            PhysicalStorageSubset::window(SubsetId(4), "high", ram, 0xDE00, 0xDE00, 0x2200)
                .with_default_data(image[0xDE00..].to_vec()),
        )
        .unwrap();
    memory
        .add_view(MemoryView::new(
            ViewId(0),
            "cpu",
            vec![SubsetId(0), SubsetId(1), SubsetId(2), SubsetId(3), SubsetId(4)],
        ))
        .unwrap();
    memory
}

fn setup_computer(region: Region) -> Computer {
    let mut vic = Vic::new(VIC, "VIC-II", SubsetId(1), InterruptId::IRQ, region);
    let cia = Cia::new(CIA2, "CIA2", SubsetId(3), InterruptId::NMI, region);
    if let Some(notifier) = cia.notifier() {
        vic.follow_bank(notifier);
    }

    let mut computer = Computer::new(Box::new(Mos6502::new()), setup_memory());
    computer.add_chip(Box::new(vic));
    computer.add_chip(Box::new(cia));
    computer.initialize().unwrap();
    computer
}

fn vic(computer: &Computer) -> &Vic {
    computer.chip::<Vic>(VIC).unwrap()
}

#[test]
fn test_raster_interrupt_and_acknowledge() {
    let mut computer = setup_computer(Region::Pal);
    computer.bus().write(0xD012, 0x10);
    computer.bus().write(0xD01A, IRQ_RASTER);
    computer.run_for_cycles(16 * 63 + 2).unwrap();

    assert_eq!(vic(&computer).raster(), 16);
    assert_eq!(computer.bus().peek(0xD012), 0x10);
    assert_eq!(computer.bus().peek(0xD019), 0x80 | 0x70 | IRQ_RASTER);
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));

    computer.bus().write(0xD019, IRQ_RASTER);
    assert_eq!(computer.bus().peek(0xD019), 0x70);
    computer.step().unwrap();
    assert!(!computer.cpu().interrupts().is_pending(InterruptId::IRQ));
}

#[test]
fn test_raster_compare_bit_eight() {
    let mut computer = setup_computer(Region::Pal);
    computer.bus().write(0xD011, 0x9B);
    assert_eq!(vic(&computer).raster_compare(), 0x100);
    assert_eq!(computer.bus().peek(0xD019) & IRQ_RASTER, 0);

    computer.run_for_cycles(256 * 63 + 2).unwrap();
    assert_eq!(vic(&computer).raster(), 256);
    assert_eq!(computer.bus().peek(0xD011) & 0x80, 0x80);
    assert_eq!(computer.bus().peek(0xD012), 0x00);
    assert_eq!(computer.bus().peek(0xD019) & IRQ_RASTER, IRQ_RASTER);
    // Latched but not enabled
    assert!(!computer.cpu().interrupts().is_pending(InterruptId::IRQ));
}

#[test]
fn test_pal_frame_announces_every_line() {
    let mut computer = setup_computer(Region::Pal);
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = lines.clone();
    let _subscription = vic(&computer).notifier().unwrap().subscribe(move |event| {
        if event.id == EVENT_RASTER_LINE {
            sink.borrow_mut().push(event.value);
        }
    });

    computer
        .run_for_cycles(Region::Pal.cycles_per_frame() as u64)
        .unwrap();
    assert_eq!(vic(&computer).raster(), 0);
    assert_eq!(vic(&computer).cycle_in_line(), 0);

    let lines = lines.borrow();
    assert_eq!(lines.len(), 312);
    assert_eq!(lines[0], 1);
    assert_eq!(lines[310], 311);
    assert_eq!(lines[311], 0);
}

#[test]
fn test_ntsc_timing() {
    let mut computer = setup_computer(Region::Ntsc);
    computer.run_for_cycles(65 * 2).unwrap();
    assert_eq!(vic(&computer).raster(), 2);

    computer
        .run_for_cycles(Region::Ntsc.cycles_per_frame() as u64)
        .unwrap();
    // A whole frame later, one cycle over from the last NOP
    assert_eq!(vic(&computer).raster(), 2);
    assert_eq!(vic(&computer).cycle_in_line(), 1);
}

#[test]
fn test_bank_follows_cia2_port_a() {
    let mut computer = setup_computer(Region::Pal);
    assert_eq!(vic(&computer).bank(), 0);

    computer.bus().write(0xDD02, 0x03);
    computer.bus().write(0xDD00, 0x02);
    computer.step().unwrap();
    assert_eq!(vic(&computer).bank(), 1);

    computer.bus().write(0xDD00, 0x03);
    computer.step().unwrap();
    assert_eq!(vic(&computer).bank(), 0);
}

#[test]
fn test_fetch_reads_selected_bank() {
    let mut computer = setup_computer(Region::Pal);
    computer.bus().write(0x4400, 0x42);
    computer.chip_mut::<Vic>(VIC).unwrap().set_bank(1);

    let vic = computer.chip::<Vic>(VIC).unwrap();
    assert_eq!(vic.screen_address(), 0x0400);
    assert_eq!(vic.fetch(computer.memory(), vic.screen_address()), 0x42);
}

#[test]
fn test_sprite_collision_interrupt() {
    let mut computer = setup_computer(Region::Pal);
    computer.bus().write(0xD01A, IRQ_SPRITE_SPRITE);
    assert_eq!(computer.bus().peek(0xD01A), 0xF0 | IRQ_SPRITE_SPRITE);

    computer
        .chip_mut::<Vic>(VIC)
        .unwrap()
        .trigger(IRQ_SPRITE_SPRITE);
    computer.step().unwrap();
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));
    assert_eq!(computer.bus().peek(0xD019), 0x80 | 0x70 | IRQ_SPRITE_SPRITE);
}

#[test]
fn test_registers_mirror_through_window() {
    let mut computer = setup_computer(Region::Pal);
    computer.bus().write(0xD060, 0x02);
    assert_eq!(vic(&computer).border_color(), 0x02);
    assert_eq!(computer.bus().peek(0xD3E0), 0x02);
}
