//! CIA tests through the register window of a running machine.

use std::cell::RefCell;
use std::rc::Rc;

use commodore::cia::{Cia, EVENT_CNT, EVENT_FLAG, EVENT_PORT_A, EVENT_SP};
use commodore::Region;
use proptest::prelude::*;

use lib8bit::{
    Chip, ChipError, ChipId, Computer, Cpu, Event, FlatMemory, InitializationError, InterruptId, Memory,
    MemoryBus, MemoryView, Mos6502, PhysicalStorage, PhysicalStorageSubset, Subscription, SubsetId,
    ViewId,
};

const CIA: ChipId = ChipId(2);
const BASE: u16 = 0xDC00;

/// NOP-filled RAM around a CIA register window at $DC00-$DCFF. The CPU runs
/// NOPs from $8000 with interrupts masked, so requests stay pending. A
/// `JMP $8000` at $C000 keeps long runs out of the register window.
fn setup_memory() -> Memory {
    let mut image = vec![0xEA; 0x10000];
    image[0xC000..0xC003].copy_from_slice(&[0x4C, 0x00, 0x80]);
    image[0xFFFC] = 0x00;
    image[0xFFFD] = 0x80;

    let mut memory = Memory::new();
    let ram = memory.add_storage(PhysicalStorage::ram("RAM", 0x10000));
    memory
        .add_subset(
            PhysicalStorageSubset::window(SubsetId(0), "low", ram, 0, 0x0000, 0xDC00)
                .with_default_data(image[..0xDC00].to_vec()),
        )
        .unwrap();
    memory
        .add_subset(PhysicalStorageSubset::registers(SubsetId(1), "CIA", BASE, 0x100))
        .unwrap();
    memory
        .add_subset(
            PhysicalStorageSubset::window(SubsetId(2), "high", ram, 0xDD00, 0xDD00, 0x2300)
                .with_default_data(image[0xDD00..].to_vec()),
        )
        .unwrap();
    memory
        .add_view(MemoryView::new(
            ViewId(0),
            "cpu",
            vec![SubsetId(0), SubsetId(1), SubsetId(2)],
        ))
        .unwrap();
    memory
}

fn setup_computer(interrupt: InterruptId) -> Computer {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut computer = Computer::new(Box::new(Mos6502::new()), setup_memory());
    computer.add_chip(Box::new(Cia::new(CIA, "CIA1", SubsetId(1), interrupt, Region::Pal)));
    computer.initialize().unwrap();
    computer
}

fn write(computer: &mut Computer, register: u16, value: u8) {
    computer.bus().write(BASE + register, value);
}

fn peek(computer: &mut Computer, register: u16) -> u8 {
    computer.bus().peek(BASE + register)
}

fn cia(computer: &Computer) -> &Cia {
    computer.chip::<Cia>(CIA).unwrap()
}

/// Records the bits the serial port puts on SP.
fn record_serial(computer: &Computer) -> (Rc<RefCell<Vec<i64>>>, Subscription) {
    let bits = Rc::new(RefCell::new(Vec::new()));
    let sink = bits.clone();
    let subscription = cia(computer).notifier().unwrap().subscribe(move |event| {
        if event.id == EVENT_SP {
            sink.borrow_mut().push(event.value);
        }
    });
    (bits, subscription)
}

/// Latches timer A with `latch` and starts it with `control` in CRA.
fn start_timer_a(computer: &mut Computer, latch: u16, control: u8) {
    write(computer, 0x04, latch as u8);
    write(computer, 0x05, (latch >> 8) as u8);
    write(computer, 0x0E, control);
}

#[test]
fn test_timer_a_underflow_latches_icr() {
    let mut computer = setup_computer(InterruptId::IRQ);
    start_timer_a(&mut computer, 16, 0x01);
    computer.run_for_cycles(20).unwrap();

    assert_eq!(peek(&mut computer, 0x0D), 0x01);
    // Not enabled, so no request
    assert!(!computer.cpu().interrupts().is_pending(InterruptId::IRQ));

    // Reading returns and clears
    assert_eq!(computer.bus().read(BASE + 0x0D), 0x01);
    assert_eq!(peek(&mut computer, 0x0D), 0x00);
}

#[test]
fn test_enabled_timer_requests_irq_until_acknowledged() {
    let mut computer = setup_computer(InterruptId::IRQ);
    write(&mut computer, 0x0D, 0x81);
    start_timer_a(&mut computer, 16, 0x01);
    computer.run_for_cycles(20).unwrap();

    assert_eq!(peek(&mut computer, 0x0D), 0x81);
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));
    assert_eq!(cia(&computer).interrupt().reason(), 0x01);

    computer.bus().read(BASE + 0x0D);
    computer.step().unwrap();
    assert!(!computer.cpu().interrupts().is_pending(InterruptId::IRQ));
}

#[test]
fn test_icr_mask_clear() {
    let mut computer = setup_computer(InterruptId::IRQ);
    write(&mut computer, 0x0D, 0x83);
    assert!(cia(&computer).timer_a().interrupt_enabled());
    assert!(cia(&computer).timer_b().interrupt_enabled());

    write(&mut computer, 0x0D, 0x01);
    assert!(!cia(&computer).timer_a().interrupt_enabled());
    assert!(cia(&computer).timer_b().interrupt_enabled());
}

#[test]
fn test_one_shot_stops_and_reloads() {
    let mut computer = setup_computer(InterruptId::IRQ);
    start_timer_a(&mut computer, 16, 0x09);
    computer.run_for_cycles(40).unwrap();

    assert!(!cia(&computer).timer_a().is_counting());
    assert_eq!(cia(&computer).timer_a().current_value(), 16);
    assert_eq!(peek(&mut computer, 0x0E) & 0x09, 0x08);
    assert_eq!(peek(&mut computer, 0x04), 16);
    assert_eq!(peek(&mut computer, 0x05), 0);
}

#[test]
fn test_timer_b_counts_timer_a_underflows() {
    let mut computer = setup_computer(InterruptId::IRQ);
    write(&mut computer, 0x06, 3);
    write(&mut computer, 0x07, 0);
    write(&mut computer, 0x0F, 0x41);
    start_timer_a(&mut computer, 4, 0x01);

    computer.run_for_cycles(10).unwrap();
    assert_eq!(cia(&computer).timer_b().current_value(), 1);
    computer.run_for_cycles(2).unwrap();
    assert_eq!(peek(&mut computer, 0x0D) & 0x02, 0x02);
    assert_eq!(peek(&mut computer, 0x0F) & 0x60, 0x40);
}

#[test]
fn test_pb6_toggles_on_underflow() {
    let mut computer = setup_computer(InterruptId::IRQ);
    start_timer_a(&mut computer, 4, 0x07);
    assert_eq!(peek(&mut computer, 0x01) & 0x40, 0x40);

    computer.run_for_cycles(4).unwrap();
    assert_eq!(peek(&mut computer, 0x01) & 0x40, 0x00);
    computer.run_for_cycles(4).unwrap();
    assert_eq!(peek(&mut computer, 0x01) & 0x40, 0x40);
}

#[test]
fn test_registers_mirror_every_sixteen_bytes() {
    let mut computer = setup_computer(InterruptId::IRQ);
    write(&mut computer, 0x12, 0xF0); // DDR A
    assert_eq!(peek(&mut computer, 0x02), 0xF0);
    assert_eq!(peek(&mut computer, 0xF2), 0xF0);
}

#[test]
fn test_port_a_selects_vic_bank_and_notifies() {
    let mut computer = setup_computer(InterruptId::NMI);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = cia(&computer).notifier().unwrap().subscribe(move |event| {
        if event.id == EVENT_PORT_A {
            sink.borrow_mut().push(event.value);
        }
    });

    assert_eq!(cia(&computer).vic_bank(), 0);
    write(&mut computer, 0x02, 0x03);
    write(&mut computer, 0x00, 0x02);
    assert_eq!(cia(&computer).vic_bank(), 1);
    assert_eq!(*seen.borrow(), vec![0xFC, 0xFE]);
}

#[test]
fn test_tod_alarm_after_one_tenth() {
    let mut computer = setup_computer(InterruptId::IRQ);
    // Alarm at 1:00:00.1 AM
    write(&mut computer, 0x0F, 0x80);
    write(&mut computer, 0x0B, 0x01);
    write(&mut computer, 0x0A, 0x00);
    write(&mut computer, 0x09, 0x00);
    write(&mut computer, 0x08, 0x01);
    write(&mut computer, 0x0F, 0x00);
    write(&mut computer, 0x0D, 0x84);

    computer
        .run_for_cycles(Region::Pal.tod_tenth_cycles() as u64 + 4)
        .unwrap();
    assert_eq!(peek(&mut computer, 0x08), 0x01);
    assert_eq!(peek(&mut computer, 0x0B), 0x01);
    assert_eq!(peek(&mut computer, 0x0D), 0x84);
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));
}

#[test]
fn test_serial_output_shifts_msb_first() {
    let mut computer = setup_computer(InterruptId::IRQ);
    let (bits, _subscription) = record_serial(&computer);

    write(&mut computer, 0x0D, 0x88);
    start_timer_a(&mut computer, 2, 0x41);
    write(&mut computer, 0x0C, 0xA5);
    computer.run_for_cycles(40).unwrap();

    assert_eq!(*bits.borrow(), vec![1, 0, 1, 0, 0, 1, 0, 1]);
    // Timer A underflows are flagged too, but only the serial port is enabled
    assert_eq!(peek(&mut computer, 0x0D), 0x89);
    assert!(!cia(&computer).serial().is_sending());
}

#[test]
fn test_serial_output_needs_continuous_timer_a() {
    let mut computer = setup_computer(InterruptId::IRQ);
    let (bits, _subscription) = record_serial(&computer);

    write(&mut computer, 0x0D, 0x88);
    // One-shot timer A never clocks the shift register
    start_timer_a(&mut computer, 2, 0x49);
    write(&mut computer, 0x0C, 0xA5);
    computer.run_for_cycles(40).unwrap();

    assert!(bits.borrow().is_empty());
    assert_eq!(peek(&mut computer, 0x0D) & 0x08, 0x00);
    assert!(!cia(&computer).serial().is_sending());
}

#[test]
fn test_serial_cnt_toggles_at_half_period() {
    let mut computer = setup_computer(InterruptId::IRQ);
    let cnt = Rc::new(RefCell::new(Vec::new()));
    let sink = cnt.clone();
    let _subscription = cia(&computer).notifier().unwrap().subscribe(move |event| {
        if event.id == EVENT_CNT {
            sink.borrow_mut().push(event.value);
        }
    });

    start_timer_a(&mut computer, 8, 0x41);
    write(&mut computer, 0x0C, 0xFF);
    // Half of the 8-cycle period has passed after 4 cycles
    computer.run_for_cycles(2).unwrap();
    assert!(cnt.borrow().is_empty());
    computer.run_for_cycles(2).unwrap();
    assert_eq!(*cnt.borrow(), vec![0]);
    computer.run_for_cycles(8).unwrap();
    assert_eq!(*cnt.borrow(), vec![0, 1]);
}

#[test]
fn test_flag_event_sets_icr_bit() {
    let mut computer = setup_computer(InterruptId::IRQ);
    write(&mut computer, 0x0D, 0x90);
    computer
        .chip_mut::<Cia>(CIA)
        .unwrap()
        .push_event(Event::new(EVENT_FLAG));
    computer.step().unwrap();

    assert_eq!(peek(&mut computer, 0x0D), 0x90);
    assert!(computer.cpu().interrupts().is_pending(InterruptId::IRQ));
}

#[test]
fn test_nmi_cia_is_edge_triggered() {
    let mut computer = setup_computer(InterruptId::NMI);
    write(&mut computer, 0x0D, 0x81);
    start_timer_a(&mut computer, 16, 0x01);
    computer.run_for_cycles(20).unwrap();

    // The NMI was taken even though I is set
    assert!(computer.cpu().interrupts().is_in_execution(InterruptId::NMI));
}

#[test]
fn test_simulate_before_initialize_fails() {
    let mut chip = Cia::new(CIA, "CIA1", SubsetId(1), InterruptId::IRQ, Region::Pal);
    let mut memory = setup_memory();
    let mut bus = FlatMemory::new();
    let mut cpu = Mos6502::new();
    cpu.reset(&mut bus);

    let err = chip.simulate(&mut cpu, &mut memory).unwrap_err();
    assert_eq!(err, ChipError::NotInitialized("CIA1".into()));
    assert_eq!(chip.error(), Some(&err));
}

#[test]
fn test_initialize_needs_register_subset() {
    let mut memory = setup_memory();

    let mut missing = Cia::new(CIA, "CIA1", SubsetId(7), InterruptId::IRQ, Region::Pal);
    assert_eq!(
        missing.initialize(&mut memory),
        Err(InitializationError::SubsetNotFound(SubsetId(7)))
    );

    let mut wrong = Cia::new(CIA, "CIA1", SubsetId(0), InterruptId::IRQ, Region::Pal);
    assert!(matches!(
        wrong.initialize(&mut memory),
        Err(InitializationError::MissingRegisters { .. })
    ));
}

proptest! {
    /// A continuous timer A toggles PB6 once per latch period
    #[test]
    fn prop_continuous_timer_a_period(half in 1u16..100, periods in 1u64..6) {
        let latch = half * 2;
        let mut computer = setup_computer(InterruptId::IRQ);
        start_timer_a(&mut computer, latch, 0x07);

        computer.run_for_cycles(periods * latch as u64 - 2).unwrap();
        let before = peek(&mut computer, 0x01) & 0x40;
        computer.run_for_cycles(2).unwrap();
        let after = peek(&mut computer, 0x01) & 0x40;

        let expected = if periods % 2 == 0 { 0x40 } else { 0x00 };
        prop_assert_eq!(after, expected);
        prop_assert_ne!(before, after);
        prop_assert_eq!(cia(&computer).timer_a().current_value(), latch);
    }
}
